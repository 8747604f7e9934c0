use crate::adapters::AdapterError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("a transcription run is already active")]
    AlreadyRunning,

    #[error("failed to split audio file: {0}")]
    Split(#[source] AdapterError),

    #[error("no transcripts are available for merging")]
    FusionUnavailable,

    #[error("failed to merge transcripts: {0}")]
    Fusion(#[source] AdapterError),

    #[error("run {0} stopped before it could report")]
    Interrupted(Uuid),
}
