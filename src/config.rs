use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `ALBERTINE__SERVICE__HTTP__PORT=9000`
const ENV_PREFIX: &str = "ALBERTINE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub transcription: TranscriptionConfig,
    pub audio: AudioConfig,
    pub settings: SettingsConfig,
    pub nats: Option<NatsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "albertine".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Transcription endpoint (multipart upload)
    pub api_url: String,
    pub model: String,
    /// File holding the obfuscated API key
    pub key_file: String,
    /// Where `fetch-key` downloads the obfuscated key from
    pub key_url: Option<String>,
    pub timeout_secs: u64,
    /// Directory receiving one transcript per chunk, and the merged transcript
    pub output_dir: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://albert.api.etalab.gouv.fr/v1/audio/transcriptions".to_string(),
            model: "openweight-audio".to_string(),
            key_file: "./albertine.key".to_string(),
            key_url: None,
            timeout_secs: 600,
            output_dir: "~/Documents/transcription_albertine".to_string(),
        }
    }
}

impl TranscriptionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn output_dir(&self) -> PathBuf {
        expand_path(&self.output_dir)
    }

    pub fn key_file(&self) -> PathBuf {
        expand_path(&self.key_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Root directory for transient chunk files
    pub chunks_dir: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunks_dir: "~/Documents/transcription_albertine/audio_chunks".to_string(),
        }
    }
}

impl AudioConfig {
    pub fn chunks_dir(&self) -> PathBuf {
        expand_path(&self.chunks_dir)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// JSON file holding the user settings
    pub path: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: "./store.json".to_string(),
        }
    }
}

impl SettingsConfig {
    pub fn path(&self) -> PathBuf {
        expand_path(&self.path)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    pub url: String,
    #[serde(default = "default_nats_subject")]
    pub subject: String,
}

fn default_nats_subject() -> String {
    "albertine.progress".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
