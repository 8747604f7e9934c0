//! Progress notifications emitted by a run
//!
//! The orchestrator never renders anything; it hands structured events to a
//! `ProgressSink`. Sinks here cover logging, in-process subscribers and
//! fan-out to several sinks at once.

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    SplitStarted {
        run_id: Uuid,
        session_name: String,
        file_path: PathBuf,
        chunk_minutes: u32,
    },
    SplitCompleted {
        run_id: Uuid,
        chunks: Vec<PathBuf>,
        /// Upper bound on how long the whole transcription should take
        estimated_max_secs: u64,
    },
    SplitFailed {
        run_id: Uuid,
        error: String,
    },
    ChunkDispatched {
        run_id: Uuid,
        index: usize,
        total: usize,
        label: String,
    },
    ChunkSucceeded {
        run_id: Uuid,
        index: usize,
        artifact: PathBuf,
    },
    ChunkFailed {
        run_id: Uuid,
        index: usize,
        error: String,
    },
    RunTerminated {
        run_id: Uuid,
        cancelled: bool,
        error_count: usize,
        message: Option<String>,
        cleanup_error: Option<String>,
    },
    FusionOffered {
        run_id: Uuid,
        artifacts: usize,
    },
    FusionWithdrawn,
    FusionCompleted {
        output: PathBuf,
    },
    FusionFailed {
        error: String,
    },
}

impl ProgressEvent {
    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            ProgressEvent::SplitStarted { run_id, .. }
            | ProgressEvent::SplitCompleted { run_id, .. }
            | ProgressEvent::SplitFailed { run_id, .. }
            | ProgressEvent::ChunkDispatched { run_id, .. }
            | ProgressEvent::ChunkSucceeded { run_id, .. }
            | ProgressEvent::ChunkFailed { run_id, .. }
            | ProgressEvent::RunTerminated { run_id, .. }
            | ProgressEvent::FusionOffered { run_id, .. } => Some(*run_id),
            ProgressEvent::FusionWithdrawn
            | ProgressEvent::FusionCompleted { .. }
            | ProgressEvent::FusionFailed { .. } => None,
        }
    }
}

/// Upper bound on transcription time: a tenth of the audio duration.
pub fn estimate_max_duration(chunk_count: usize, chunk_minutes: u32) -> Duration {
    // chunks * minutes * 0.1 min == chunks * minutes * 6 s
    Duration::from_secs(chunk_count as u64 * chunk_minutes as u64 * 6)
}

/// Receives progress events from the orchestrator
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ProgressSink for LogSink {
    async fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::SplitStarted {
                session_name,
                file_path,
                chunk_minutes,
                ..
            } => info!(
                "[{}] Splitting {} into {} minute chunks",
                session_name,
                file_path.display(),
                chunk_minutes
            ),
            ProgressEvent::SplitCompleted {
                chunks,
                estimated_max_secs,
                ..
            } => {
                info!("Audio split into {} chunks", chunks.len());
                for chunk in &chunks {
                    info!("  {}", chunk.display());
                }
                info!(
                    "Sending chunks one at a time, estimated at most {}' {:02}\"",
                    estimated_max_secs / 60,
                    estimated_max_secs % 60
                );
            }
            ProgressEvent::SplitFailed { error, .. } => {
                error!("Failed to split audio file: {}", error)
            }
            ProgressEvent::ChunkDispatched {
                index, total, label, ..
            } => info!("Transcribing chunk {}/{} ({})", index + 1, total, label),
            ProgressEvent::ChunkSucceeded {
                index, artifact, ..
            } => info!("Chunk {} transcribed: {}", index + 1, artifact.display()),
            ProgressEvent::ChunkFailed { index, error, .. } => {
                warn!("Chunk {} failed: {}", index + 1, error)
            }
            ProgressEvent::RunTerminated {
                cancelled,
                error_count,
                message,
                cleanup_error,
                ..
            } => {
                if cancelled {
                    info!("Transcription cancelled");
                } else if error_count > 0 {
                    warn!("Transcription finished with {} failed chunk(s)", error_count);
                } else {
                    info!("Transcription finished");
                }
                if let Some(message) = message {
                    info!("{}", message);
                }
                if let Some(err) = cleanup_error {
                    error!("Failed to remove temporary files: {}", err);
                }
            }
            ProgressEvent::FusionOffered { artifacts, .. } => {
                info!("{} transcripts can now be merged", artifacts)
            }
            ProgressEvent::FusionWithdrawn => info!("Merge no longer available"),
            ProgressEvent::FusionCompleted { output } => {
                info!("Merged transcript written: {}", output.display())
            }
            ProgressEvent::FusionFailed { error } => {
                error!("Failed to merge transcripts: {}", error)
            }
        }
    }
}

/// Publishes events on a tokio broadcast channel
///
/// Send errors (no subscribers) are ignored.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<ProgressEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Events emitted from now on, as a stream. Lagging subscribers skip
    /// the events they missed.
    pub fn stream(&self) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        stream::unfold(self.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Progress subscriber lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }
}

#[async_trait]
impl ProgressSink for BroadcastSink {
    async fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Forwards every event to each inner sink, in order
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl ProgressSink for FanoutSink {
    async fn emit(&self, event: ProgressEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_a_tenth_of_audio_length() {
        // 3 chunks of 10 minutes: 30 min of audio, 3 min upper bound
        assert_eq!(estimate_max_duration(3, 10), Duration::from_secs(180));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = ProgressEvent::ChunkFailed {
            run_id: Uuid::nil(),
            index: 1,
            error: "boom".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"chunk_failed\""));
        assert!(json.contains("\"index\":1"));
    }
}
