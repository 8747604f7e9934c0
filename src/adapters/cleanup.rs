use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{AdapterError, Terminator};

/// Deletes the transient chunk files left under the chunks directory
#[derive(Debug, Clone)]
pub struct ChunkCleaner {
    chunks_dir: PathBuf,
}

impl ChunkCleaner {
    pub fn new(chunks_dir: impl Into<PathBuf>) -> Self {
        Self {
            chunks_dir: chunks_dir.into(),
        }
    }

    pub fn chunks_dir(&self) -> &Path {
        &self.chunks_dir
    }
}

#[async_trait]
impl Terminator for ChunkCleaner {
    async fn terminate(&self, cancelled: bool) -> Result<String, AdapterError> {
        if !tokio::fs::try_exists(&self.chunks_dir)
            .await
            .map_err(|e| AdapterError::Cleanup(e.to_string()))?
        {
            warn!("Chunks directory {} is already gone", self.chunks_dir.display());
        } else {
            let mut entries = tokio::fs::read_dir(&self.chunks_dir)
                .await
                .map_err(|e| AdapterError::Cleanup(e.to_string()))?;

            let mut removed = 0usize;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| AdapterError::Cleanup(e.to_string()))?
            {
                let path = entry.path();
                let is_dir = entry
                    .file_type()
                    .await
                    .map_err(|e| AdapterError::Cleanup(e.to_string()))?
                    .is_dir();

                let result = if is_dir {
                    tokio::fs::remove_dir_all(&path).await
                } else {
                    tokio::fs::remove_file(&path).await
                };
                result.map_err(|e| {
                    AdapterError::Cleanup(format!("{}: {}", path.display(), e))
                })?;
                removed += 1;
            }

            info!(
                "Removed {} entries from {}",
                removed,
                self.chunks_dir.display()
            );
        }

        Ok(if cancelled {
            "Run cancelled, temporary files removed.".to_string()
        } else {
            "Temporary files removed.".to_string()
        })
    }
}
