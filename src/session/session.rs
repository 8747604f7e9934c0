use super::validator::{check_session_name, NameRejection};
use crate::settings::{Settings, MAX_CHUNK_DURATION, MIN_CHUNK_DURATION};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid session name: {0}")]
    InvalidName(NameRejection),

    #[error("chunk duration of {0} minutes is outside the allowed 2 to 12 minutes")]
    ChunkDurationOutOfRange(u32),

    #[error("no audio file selected")]
    MissingFile,
}

/// Everything a run needs to know about the audio to transcribe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Validated session name, also the stem of every chunk and of the merged transcript
    pub name: String,

    /// Source audio file
    pub file_path: PathBuf,

    /// Length of each chunk in minutes
    pub chunk_duration_minutes: u32,

    /// ISO-639 language code
    pub language: String,

    /// Route outbound calls through the system proxy
    pub use_system_proxy: bool,
}

impl Session {
    /// Create a session from a name, a file and the current settings.
    pub fn new(
        name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        settings: &Settings,
    ) -> Result<Self, SessionError> {
        Self::with_options(
            name,
            file_path,
            settings.chunk_duration,
            settings.language.clone(),
            settings.use_system_proxy(),
        )
    }

    pub fn with_options(
        name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        chunk_duration_minutes: u32,
        language: impl Into<String>,
        use_system_proxy: bool,
    ) -> Result<Self, SessionError> {
        let name = name.into();
        check_session_name(&name).map_err(SessionError::InvalidName)?;

        let file_path = file_path.into();
        if file_path.as_os_str().is_empty() {
            return Err(SessionError::MissingFile);
        }

        if !(MIN_CHUNK_DURATION..=MAX_CHUNK_DURATION).contains(&chunk_duration_minutes) {
            return Err(SessionError::ChunkDurationOutOfRange(chunk_duration_minutes));
        }

        Ok(Self {
            name,
            file_path,
            chunk_duration_minutes,
            language: language.into(),
            use_system_proxy,
        })
    }

    /// Human-readable span of the chunk at `index`, e.g. "Audio from 10 to 20 minutes"
    pub fn chunk_label(&self, index: usize) -> String {
        let minutes = self.chunk_duration_minutes as usize;
        format!(
            "Audio from {} to {} minutes",
            index * minutes,
            (index + 1) * minutes
        )
    }

    /// File name of the merged transcript for this session
    pub fn fused_file_name(&self) -> String {
        fused_file_name(&self.name)
    }
}

pub(crate) fn fused_file_name(session_name: &str) -> String {
    format!("{}_entier.txt", session_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_label_spans_minutes() {
        let session = Session::with_options("ConseilIUT", "talk.wav", 10, "fr", true).unwrap();
        assert_eq!(session.chunk_label(0), "Audio from 0 to 10 minutes");
        assert_eq!(session.chunk_label(2), "Audio from 20 to 30 minutes");
    }

    #[test]
    fn fused_name_uses_session_name() {
        let session = Session::with_options("ConseilIUT", "talk.wav", 5, "fr", true).unwrap();
        assert_eq!(session.fused_file_name(), "ConseilIUT_entier.txt");
    }
}
