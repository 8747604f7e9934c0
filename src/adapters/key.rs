//! API key obfuscation
//!
//! Keys are stored XOR-ed with a fixed byte and base64-encoded. This keeps
//! the key out of plain sight on disk; it is not encryption.

use anyhow::{Context, Result};
use base64::Engine;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const OBFUSCATION_KEY: u8 = 42;

pub fn encrypt_api_key(input: &str) -> String {
    let bytes: Vec<u8> = input.bytes().map(|b| b ^ OBFUSCATION_KEY).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn decrypt_api_key(encoded: &str) -> Result<String> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .context("API key is not valid base64")?;
    let bytes: Vec<u8> = decoded.iter().map(|b| b ^ OBFUSCATION_KEY).collect();
    String::from_utf8(bytes).context("API key is not valid UTF-8")
}

/// Read and decode the key stored at `path`.
pub fn load_api_key(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let encoded = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read API key file {}", path.display()))?;
    decrypt_api_key(&encoded)
}

/// Download the obfuscated key from `url` and store it at `dest` as-is.
pub async fn fetch_api_key(url: &str, dest: impl AsRef<Path>) -> Result<()> {
    let dest = dest.as_ref();
    info!("Downloading API key from {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to download API key")?;

    if !response.status().is_success() {
        anyhow::bail!("API key download failed ({})", response.status());
    }

    let body = response
        .text()
        .await
        .context("Failed to read API key response")?;

    // Refuse to overwrite a working key with garbage
    decrypt_api_key(&body)?;

    tokio::fs::write(dest, body.trim())
        .await
        .with_context(|| format!("Failed to write API key file {}", dest.display()))?;

    info!("API key saved to {}", dest.display());
    Ok(())
}
