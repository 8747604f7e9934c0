//! External collaborators of a transcription run
//!
//! The orchestrator only talks to these traits. Concrete implementations:
//! - `WavSplitter`: splits a WAV file into fixed-duration chunk files
//! - `AlbertClient`: remote transcription over HTTP
//! - `ChunkCleaner`: removes transient chunk files once a run ends
//! - `TranscriptConcatenator`: merges per-chunk transcripts into one file

pub mod albert;
pub mod cleanup;
pub mod fusion;
pub mod key;
pub mod wav_split;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use albert::{AlbertClient, AlbertConfig};
pub use cleanup::ChunkCleaner;
pub use fusion::TranscriptConcatenator;
pub use key::{decrypt_api_key, encrypt_api_key, fetch_api_key, load_api_key};
pub use wav_split::WavSplitter;

/// Failure reported by a collaborator
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported or malformed audio: {0}")]
    Format(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("cleanup failed: {0}")]
    Cleanup(String),
}

/// One chunk transcription request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    pub chunk_path: PathBuf,
    pub use_system_proxy: bool,
    pub language: String,
    /// Human-readable span, written in the transcript header
    pub label: String,
}

/// Cuts the source audio into ordered chunk files
#[async_trait]
pub trait Splitter: Send + Sync {
    /// Returns chunk paths in playback order
    async fn split(
        &self,
        file_path: &Path,
        session_name: &str,
        chunk_minutes: u32,
    ) -> Result<Vec<PathBuf>, AdapterError>;
}

/// Turns one chunk into a transcript artifact
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Returns the path of the written artifact
    async fn transcribe(&self, request: &ChunkRequest) -> Result<PathBuf, AdapterError>;
}

/// Releases whatever a run left behind
#[async_trait]
pub trait Terminator: Send + Sync {
    /// Returns a status message
    async fn terminate(&self, cancelled: bool) -> Result<String, AdapterError>;
}

/// Merges artifacts into one output file
#[async_trait]
pub trait Fuser: Send + Sync {
    async fn fuse(&self, artifacts: &[PathBuf], output_name: &str)
        -> Result<PathBuf, AdapterError>;
}
