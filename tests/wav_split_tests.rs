// WAV splitting tests against real files in a temp directory

use albertine::adapters::WavSplitter;
use albertine::{AdapterError, Splitter};
use anyhow::Result;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use tempfile::TempDir;

/// Mono 16-bit WAV at a tiny sample rate, so minutes of audio stay small
fn write_wav(path: &Path, sample_rate: u32, seconds: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for i in 0..(sample_rate * seconds) {
        writer.write_sample((i % 1000) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[tokio::test]
async fn test_split_into_fixed_duration_chunks() -> Result<()> {
    let dir = TempDir::new()?;
    let source = dir.path().join("meeting.wav");
    // 5 minutes at 100 Hz
    write_wav(&source, 100, 300)?;

    let splitter = WavSplitter::new(dir.path().join("chunks"));
    let chunks = splitter.split(&source, "ConseilIUT", 2).await?;

    assert_eq!(chunks.len(), 3);
    let names: Vec<String> = chunks
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "ConseilIUT-chunk-000.wav",
            "ConseilIUT-chunk-001.wav",
            "ConseilIUT-chunk-002.wav",
        ]
    );

    let lengths: Vec<u32> = chunks
        .iter()
        .map(|p| WavReader::open(p).unwrap().len())
        .collect();
    assert_eq!(lengths, vec![12_000, 12_000, 6_000]);

    for chunk in &chunks {
        assert!(chunk.starts_with(dir.path().join("chunks").join("ConseilIUT")));
        assert_eq!(WavReader::open(chunk)?.spec().sample_rate, 100);
    }
    Ok(())
}

#[tokio::test]
async fn test_short_file_yields_single_chunk() -> Result<()> {
    let dir = TempDir::new()?;
    let source = dir.path().join("short.wav");
    write_wav(&source, 100, 30)?;

    let splitter = WavSplitter::new(dir.path().join("chunks"));
    let chunks = splitter.split(&source, "ConseilIUT", 10).await?;

    assert_eq!(chunks.len(), 1);
    assert_eq!(WavReader::open(&chunks[0])?.len(), 3_000);
    Ok(())
}

#[tokio::test]
async fn test_resplit_replaces_previous_chunks() -> Result<()> {
    let dir = TempDir::new()?;
    let chunks_dir = dir.path().join("chunks");
    let splitter = WavSplitter::new(&chunks_dir);

    let long = dir.path().join("long.wav");
    write_wav(&long, 100, 600)?;
    assert_eq!(splitter.split(&long, "ConseilIUT", 2).await?.len(), 5);

    let short = dir.path().join("short.wav");
    write_wav(&short, 100, 150)?;
    let chunks = splitter.split(&short, "ConseilIUT", 2).await?;

    assert_eq!(chunks.len(), 2);
    let on_disk = std::fs::read_dir(chunks_dir.join("ConseilIUT"))?.count();
    assert_eq!(on_disk, 2);
    Ok(())
}

#[tokio::test]
async fn test_float_wav_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let source = dir.path().join("float.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 100,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&source, spec)?;
    for _ in 0..100 {
        writer.write_sample(0.5f32)?;
    }
    writer.finalize()?;

    let splitter = WavSplitter::new(dir.path().join("chunks"));
    let result = splitter.split(&source, "ConseilIUT", 2).await;

    assert!(matches!(result, Err(AdapterError::Format(_))));
    Ok(())
}

#[tokio::test]
async fn test_missing_file_is_io_error() -> Result<()> {
    let dir = TempDir::new()?;
    let splitter = WavSplitter::new(dir.path().join("chunks"));

    let result = splitter
        .split(&dir.path().join("absent.wav"), "ConseilIUT", 2)
        .await;

    assert!(matches!(result, Err(AdapterError::Io(_))));
    Ok(())
}

#[tokio::test]
async fn test_not_a_wav_file_is_format_error() -> Result<()> {
    let dir = TempDir::new()?;
    let source = dir.path().join("notes.wav");
    std::fs::write(&source, b"this is not audio")?;

    let splitter = WavSplitter::new(dir.path().join("chunks"));
    let result = splitter.split(&source, "ConseilIUT", 2).await;

    assert!(matches!(result, Err(AdapterError::Format(_))));
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_duration_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let source = dir.path().join("meeting.wav");
    write_wav(&source, 100, 60)?;

    let splitter = WavSplitter::new(dir.path().join("chunks"));
    assert!(splitter.split(&source, "ConseilIUT", 1).await.is_err());
    assert!(splitter.split(&source, "ConseilIUT", 13).await.is_err());
    assert!(!dir.path().join("chunks").exists());
    Ok(())
}
