use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::{AdapterError, Fuser};

/// Concatenates per-chunk transcripts, in the given order, into one file
#[derive(Debug, Clone)]
pub struct TranscriptConcatenator {
    output_dir: PathBuf,
}

impl TranscriptConcatenator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl Fuser for TranscriptConcatenator {
    async fn fuse(
        &self,
        artifacts: &[PathBuf],
        output_name: &str,
    ) -> Result<PathBuf, AdapterError> {
        let mut merged = String::new();
        for artifact in artifacts {
            let text = tokio::fs::read_to_string(artifact).await.map_err(|e| {
                AdapterError::Io(std::io::Error::new(
                    e.kind(),
                    format!("{}: {}", artifact.display(), e),
                ))
            })?;
            merged.push_str(&text);
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output = self.output_dir.join(output_name);
        tokio::fs::write(&output, merged.as_bytes()).await?;

        info!(
            "Merged {} transcripts into {}",
            artifacts.len(),
            output.display()
        );
        Ok(output)
    }
}
