// Service configuration loading tests

use albertine::Config;
use anyhow::Result;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_missing_file_uses_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("absent");

    let cfg = Config::load_or_default(path.to_str().unwrap())?;

    assert_eq!(cfg.service.name, "albertine");
    assert_eq!(cfg.service.http.port, 8089);
    assert_eq!(cfg.transcription.model, "openweight-audio");
    assert_eq!(cfg.transcription.timeout(), Duration::from_secs(600));
    assert!(cfg.nats.is_none());
    Ok(())
}

#[test]
fn test_load_requires_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("absent");

    assert!(Config::load(path.to_str().unwrap()).is_err());
    Ok(())
}

#[test]
fn test_partial_file_keeps_other_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("albertine.toml");
    std::fs::write(
        &path,
        r#"
[service.http]
port = 9100

[transcription]
timeout_secs = 120
output_dir = "/srv/transcripts"

[nats]
url = "nats://localhost:4222"
"#,
    )?;

    let cfg = Config::load(path.to_str().unwrap())?;

    assert_eq!(cfg.service.http.port, 9100);
    assert_eq!(cfg.service.http.bind, "127.0.0.1");
    assert_eq!(cfg.transcription.timeout(), Duration::from_secs(120));
    assert_eq!(
        cfg.transcription.output_dir(),
        std::path::PathBuf::from("/srv/transcripts")
    );
    assert_eq!(cfg.transcription.model, "openweight-audio");

    let nats = cfg.nats.expect("nats section");
    assert_eq!(nats.url, "nats://localhost:4222");
    assert_eq!(nats.subject, "albertine.progress");
    Ok(())
}

#[test]
fn test_home_relative_paths_are_expanded() {
    let cfg = Config::default();
    let output_dir = cfg.transcription.output_dir();

    assert!(!output_dir.to_string_lossy().starts_with('~'));
    assert!(output_dir.ends_with("Documents/transcription_albertine"));
    assert!(cfg.audio.chunks_dir().ends_with("audio_chunks"));
}
