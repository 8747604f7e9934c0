//! Wiring of the production collaborators from the service configuration

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::adapters::{
    load_api_key, AlbertClient, AlbertConfig, ChunkCleaner, TranscriptConcatenator, WavSplitter,
};
use crate::config::Config;
use crate::nats::{NatsClient, NatsProgressSink};
use crate::run::{Collaborators, FanoutSink, LogSink, ProgressSink, TranscriptionOrchestrator};

/// Build the split/transcribe/terminate/fuse collaborators described by `config`.
pub fn collaborators(config: &Config) -> Result<Collaborators> {
    let key_file = config.transcription.key_file();
    let api_key = load_api_key(&key_file).with_context(|| {
        format!(
            "No usable API key at {} (run `albertine fetch-key` first)",
            key_file.display()
        )
    })?;

    let chunks_dir = config.audio.chunks_dir();
    let output_dir = config.transcription.output_dir();

    let transcriber = AlbertClient::new(AlbertConfig {
        api_url: config.transcription.api_url.clone(),
        model: config.transcription.model.clone(),
        api_key,
        timeout: config.transcription.timeout(),
        output_dir: output_dir.clone(),
    })?;

    info!(
        "Chunks in {}, transcripts in {}",
        chunks_dir.display(),
        output_dir.display()
    );

    Ok(Collaborators {
        splitter: Arc::new(WavSplitter::new(&chunks_dir)),
        transcriber: Arc::new(transcriber),
        terminator: Arc::new(ChunkCleaner::new(&chunks_dir)),
        fuser: Arc::new(TranscriptConcatenator::new(output_dir)),
    })
}

/// Log sink, plus NATS publishing when configured, plus any `extra` sinks.
pub async fn progress_sink(
    config: &Config,
    extra: Vec<Arc<dyn ProgressSink>>,
) -> Result<Arc<dyn ProgressSink>> {
    let mut sink = FanoutSink::new().with(Arc::new(LogSink));

    if let Some(nats) = &config.nats {
        let client = NatsClient::connect(&nats.url, config.service.name.clone()).await?;
        sink = sink.with(Arc::new(NatsProgressSink::new(client, nats.subject.clone())));
    }

    for extra in extra {
        sink = sink.with(extra);
    }

    Ok(Arc::new(sink))
}

pub async fn orchestrator(
    config: &Config,
    extra_sinks: Vec<Arc<dyn ProgressSink>>,
) -> Result<TranscriptionOrchestrator> {
    let collaborators = collaborators(config)?;
    let sink = progress_sink(config, extra_sinks).await?;
    Ok(TranscriptionOrchestrator::new(collaborators, sink))
}
