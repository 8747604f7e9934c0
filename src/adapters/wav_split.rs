use anyhow::Context;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{AdapterError, Splitter};
use crate::settings::{MAX_CHUNK_DURATION, MIN_CHUNK_DURATION};

/// Splits 16-bit PCM WAV files into `<session>-chunk-NNN.wav` files
///
/// Chunks land in `<chunks_dir>/<session>/`, which is emptied first so a
/// re-run of the same session never mixes old and new chunks.
#[derive(Debug, Clone)]
pub struct WavSplitter {
    chunks_dir: PathBuf,
}

impl WavSplitter {
    pub fn new(chunks_dir: impl Into<PathBuf>) -> Self {
        Self {
            chunks_dir: chunks_dir.into(),
        }
    }

    pub fn chunks_dir(&self) -> &Path {
        &self.chunks_dir
    }

    fn split_blocking(
        file_path: &Path,
        output_dir: &Path,
        session_name: &str,
        chunk_minutes: u32,
    ) -> Result<Vec<PathBuf>, AdapterError> {
        let mut reader = WavReader::open(file_path).map_err(|e| match e {
            hound::Error::IoError(io) => AdapterError::Io(io),
            other => AdapterError::Format(format!("{}: {}", file_path.display(), other)),
        })?;

        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(AdapterError::Format(format!(
                "{}: expected 16-bit PCM, got {}-bit {:?}",
                file_path.display(),
                spec.bits_per_sample,
                spec.sample_format
            )));
        }

        info!(
            "Splitting {}: {}Hz, {} channels, {} minute chunks",
            file_path.display(),
            spec.sample_rate,
            spec.channels,
            chunk_minutes
        );

        if output_dir.exists() {
            fs::remove_dir_all(output_dir)?;
        }
        fs::create_dir_all(output_dir)?;

        let samples_per_chunk =
            spec.sample_rate as usize * spec.channels as usize * 60 * chunk_minutes as usize;

        let mut chunks = Vec::new();
        let mut writer: Option<ChunkWriter> = None;

        for sample in reader.samples::<i16>() {
            let sample = sample.map_err(|e| AdapterError::Format(e.to_string()))?;

            if writer.as_ref().map_or(true, |w| w.sample_count >= samples_per_chunk) {
                if let Some(done) = writer.take() {
                    chunks.push(done.finish()?);
                }
                let path = output_dir.join(format!("{}-chunk-{:03}.wav", session_name, chunks.len()));
                writer = Some(ChunkWriter::new(path, spec)?);
            }

            if let Some(w) = writer.as_mut() {
                w.write_sample(sample)?;
            }
        }

        if let Some(done) = writer.take() {
            chunks.push(done.finish()?);
        }

        if chunks.is_empty() {
            return Err(AdapterError::Format(format!(
                "{}: no audio samples",
                file_path.display()
            )));
        }

        info!("Split complete: {} chunks", chunks.len());
        Ok(chunks)
    }
}

#[async_trait::async_trait]
impl Splitter for WavSplitter {
    async fn split(
        &self,
        file_path: &Path,
        session_name: &str,
        chunk_minutes: u32,
    ) -> Result<Vec<PathBuf>, AdapterError> {
        if !(MIN_CHUNK_DURATION..=MAX_CHUNK_DURATION).contains(&chunk_minutes) {
            return Err(AdapterError::Format(format!(
                "chunk duration of {} minutes is out of range",
                chunk_minutes
            )));
        }

        let file_path = file_path.to_path_buf();
        let output_dir = self.chunks_dir.join(session_name);
        let session_name = session_name.to_string();

        tokio::task::spawn_blocking(move || {
            Self::split_blocking(&file_path, &output_dir, &session_name, chunk_minutes)
        })
        .await
        .map_err(|e| AdapterError::Io(std::io::Error::other(e)))?
    }
}

/// Writes a single chunk to disk as WAV file
struct ChunkWriter {
    writer: Option<WavWriter<BufWriter<File>>>,
    path: PathBuf,
    sample_count: usize,
}

impl ChunkWriter {
    fn new(path: PathBuf, spec: WavSpec) -> Result<Self, AdapterError> {
        let writer = WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))
            .map_err(to_io)?;

        Ok(Self {
            writer: Some(writer),
            path,
            sample_count: 0,
        })
    }

    fn write_sample(&mut self, sample: i16) -> Result<(), AdapterError> {
        if let Some(writer) = &mut self.writer {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")
                .map_err(to_io)?;
            self.sample_count += 1;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<PathBuf, AdapterError> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .context("Failed to finalize WAV file")
                .map_err(to_io)?;
        }
        info!(
            "Chunk written: {} ({} samples)",
            self.path.display(),
            self.sample_count
        );
        Ok(self.path.clone())
    }
}

impl Drop for ChunkWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}

fn to_io(err: anyhow::Error) -> AdapterError {
    AdapterError::Io(std::io::Error::other(format!("{:#}", err)))
}
