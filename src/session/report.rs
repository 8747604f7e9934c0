use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// What the termination step reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum TerminationStatus {
    /// Cleanup succeeded, with its status message
    Completed(String),
    /// Cleanup failed; the run outcome is unaffected
    Failed(String),
}

/// Outcome of one run, from split through termination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,

    pub session_name: String,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    /// Number of chunks produced by the split
    pub chunk_count: usize,

    /// Number of chunk calls that settled with an error
    pub error_count: usize,

    /// Whether the run stopped on a cancellation request
    pub cancelled: bool,

    /// Every artifact produced during the run, in chunk order
    pub transcribed: Vec<PathBuf>,

    pub termination: TerminationStatus,

    /// Whether the artifacts can now be merged
    pub fusion_offered: bool,
}

impl RunReport {
    pub fn duration_secs(&self) -> f64 {
        let duration = self.finished_at.signed_duration_since(self.started_at);
        duration.num_milliseconds() as f64 / 1000.0
    }

    /// One-line outcome, e.g. "Transcription finished with 1 failed chunk(s)."
    pub fn summary(&self) -> String {
        if self.cancelled {
            "Transcription cancelled.".to_string()
        } else if self.error_count > 0 {
            format!(
                "Transcription finished with {} failed chunk(s).",
                self.error_count
            )
        } else {
            "Transcription finished.".to_string()
        }
    }
}
