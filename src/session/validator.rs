use serde::Serialize;
use std::fmt;

pub const MIN_NAME_LEN: usize = 4;
pub const MAX_NAME_LEN: usize = 20;

/// Why a session name was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameRejection {
    TooShort,
    TooLong,
    InvalidCharacters,
}

impl fmt::Display for NameRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameRejection::TooShort => {
                write!(f, "the name must be at least {} characters long", MIN_NAME_LEN)
            }
            NameRejection::TooLong => {
                write!(f, "the name must not exceed {} characters", MAX_NAME_LEN)
            }
            NameRejection::InvalidCharacters => {
                write!(f, "only letters, digits, hyphen and underscore are allowed")
            }
        }
    }
}

/// Accepts names matching `^[A-Za-z0-9_-]{4,20}$`.
pub fn validate_session_name(name: &str) -> bool {
    check_session_name(name).is_ok()
}

/// Same rule as [`validate_session_name`], with the reason for a refusal.
///
/// Length is checked before the character set, so `"a!"` reports `TooShort`.
pub fn check_session_name(name: &str) -> Result<(), NameRejection> {
    let len = name.chars().count();

    if len < MIN_NAME_LEN {
        return Err(NameRejection::TooShort);
    }
    if len > MAX_NAME_LEN {
        return Err(NameRejection::TooLong);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(NameRejection::InvalidCharacters);
    }

    Ok(())
}
