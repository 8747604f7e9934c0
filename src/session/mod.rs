//! Transcription sessions
//!
//! This module provides:
//! - Session name validation
//! - The `Session` a run is started from
//! - The `RunReport` a run ends with

mod report;
mod session;
mod validator;

pub use report::{RunReport, TerminationStatus};
pub(crate) use session::fused_file_name;
pub use session::{Session, SessionError};
pub use validator::{check_session_name, validate_session_name, NameRejection};
