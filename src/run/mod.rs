//! Run orchestration
//!
//! A run goes `Idle -> Splitting -> Transcribing -> Terminating -> Idle`
//! (or back to `Idle` straight from `Splitting` when the split fails). Chunks
//! are transcribed strictly one after another; cancellation is cooperative.

mod error;
mod events;
mod orchestrator;
mod timer;

pub use tokio_util::sync::CancellationToken;
pub use error::RunError;
pub use events::{
    estimate_max_duration, BroadcastSink, FanoutSink, LogSink, ProgressEvent, ProgressSink,
};
pub use orchestrator::{
    Chunk, Collaborators, OrchestratorStatus, PendingRun, RunPhase, TranscriptionOrchestrator,
};
pub use timer::{format_elapsed, ElapsedTimer};
