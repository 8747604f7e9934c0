//! Persisted user settings
//!
//! The store is a flat JSON object (`chunk_duration`, `language`, `no_proxy`),
//! read once at start and rewritten in full on every change.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CHUNK_DURATION: u32 = 10;
pub const MIN_CHUNK_DURATION: u32 = 2;
pub const MAX_CHUNK_DURATION: u32 = 12;
pub const DEFAULT_LANGUAGE: &str = "fr";

/// User-facing settings that shape every new session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Chunk length in minutes, within [2, 12]
    pub chunk_duration: u32,

    /// ISO-639 language code sent with each chunk
    pub language: String,

    /// Bypass the system proxy for outbound calls
    pub no_proxy: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_duration: DEFAULT_CHUNK_DURATION,
            language: DEFAULT_LANGUAGE.to_string(),
            no_proxy: false,
        }
    }
}

impl Settings {
    pub fn use_system_proxy(&self) -> bool {
        !self.no_proxy
    }

    /// Build settings from a loosely typed JSON object, keeping defaults for
    /// missing or invalid keys.
    fn from_value(value: &Value) -> Self {
        let mut settings = Self::default();

        match value.get("chunk_duration").and_then(Value::as_u64) {
            Some(minutes) if is_valid_chunk_duration(minutes) => {
                settings.chunk_duration = minutes as u32;
            }
            Some(minutes) => warn!("Ignoring stored chunk_duration {}", minutes),
            None => {}
        }

        match value.get("language").and_then(Value::as_str) {
            Some(code) if !code.trim().is_empty() => settings.language = code.trim().to_string(),
            Some(_) => warn!("Ignoring empty stored language"),
            None => {}
        }

        if let Some(no_proxy) = value.get("no_proxy").and_then(Value::as_bool) {
            settings.no_proxy = no_proxy;
        }

        settings
    }
}

fn is_valid_chunk_duration(minutes: u64) -> bool {
    (MIN_CHUNK_DURATION as u64..=MAX_CHUNK_DURATION as u64).contains(&minutes)
}

/// Settings bound to their backing file
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Read the store, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let settings = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file {}", path.display()))?;
            let value: Value = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
            Settings::from_value(&value)
        } else {
            info!("No settings file at {}, using defaults", path.display());
            Settings::default()
        };

        Ok(Self { path, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_chunk_duration(&mut self, minutes: u32) -> Result<()> {
        if !is_valid_chunk_duration(minutes as u64) {
            anyhow::bail!(
                "Chunk duration must be between {} and {} minutes, got {}",
                MIN_CHUNK_DURATION,
                MAX_CHUNK_DURATION,
                minutes
            );
        }
        self.settings.chunk_duration = minutes;
        self.save()
    }

    pub fn set_language(&mut self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.is_empty() {
            anyhow::bail!("Language code must not be empty");
        }
        self.settings.language = code.to_string();
        self.save()
    }

    pub fn set_no_proxy(&mut self, no_proxy: bool) -> Result<()> {
        self.settings.no_proxy = no_proxy;
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write settings file {}", self.path.display()))?;

        info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}
