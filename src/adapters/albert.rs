//! Remote transcription client for the Albert audio API
//!
//! Each chunk is uploaded as a multipart form (`model`, `language`, `file`).
//! The raw JSON response is kept next to a readable text transcript, and the
//! text transcript is the artifact handed back to the orchestrator.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::{AdapterError, ChunkRequest, Transcriber};

const HEADER_RULE: &str = "-------------------------------------------------------------------------------";

#[derive(Debug, Clone)]
pub struct AlbertConfig {
    pub api_url: String,
    pub model: String,
    /// Decoded bearer key
    pub api_key: String,
    pub timeout: Duration,
    pub output_dir: PathBuf,
}

/// Segment of a legacy response carrying timestamps
#[derive(Debug, Deserialize)]
struct TimedSegment {
    timestamp: [f64; 2],
    text: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    chunks: Option<Vec<TimedSegment>>,
}

pub struct AlbertClient {
    config: AlbertConfig,
    direct: reqwest::Client,
    proxied: reqwest::Client,
}

impl AlbertClient {
    pub fn new(config: AlbertConfig) -> Result<Self, AdapterError> {
        let direct = reqwest::Client::builder()
            .no_proxy()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdapterError::Network(format!("failed to create HTTP client: {}", e)))?;

        let proxied = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdapterError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            direct,
            proxied,
        })
    }

    fn client(&self, use_system_proxy: bool) -> &reqwest::Client {
        if use_system_proxy {
            &self.proxied
        } else {
            &self.direct
        }
    }

    fn output_paths(&self, chunk_path: &Path) -> (PathBuf, PathBuf) {
        let stem = chunk_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chunk".to_string());
        (
            self.config.output_dir.join(format!("{}.json", stem)),
            self.config.output_dir.join(format!("{}.txt", stem)),
        )
    }
}

#[async_trait]
impl Transcriber for AlbertClient {
    async fn transcribe(&self, request: &ChunkRequest) -> Result<PathBuf, AdapterError> {
        let audio = tokio::fs::read(&request.chunk_path).await?;
        let file_name = request
            .chunk_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chunk.wav".to_string());

        let form = reqwest::multipart::Form::new()
            .text("model", self.config.model.clone())
            .text("language", request.language.clone())
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio).file_name(file_name),
            );

        debug!(
            "Uploading {} (proxy: {})",
            request.chunk_path.display(),
            request.use_system_proxy
        );

        let response = self
            .client(request.use_system_proxy)
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AdapterError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(classify_request_error)?;
        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).map_err(|e| AdapterError::Service {
                status: status.as_u16(),
                message: format!("failed to parse response: {}", e),
            })?;

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let (json_path, text_path) = self.output_paths(&request.chunk_path);
        tokio::fs::write(&json_path, body.as_bytes()).await?;

        let transcript = format_transcript(&text_path, &request.label, parsed);
        tokio::fs::write(&text_path, transcript.as_bytes()).await?;

        info!("Transcript written: {}", text_path.display());
        Ok(text_path)
    }
}

fn classify_request_error(err: reqwest::Error) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout(err.to_string())
    } else {
        AdapterError::Network(err.to_string())
    }
}

/// Header block naming the file and chunk, then the text.
///
/// Legacy responses carry timestamped segments; a blank line is inserted
/// whenever a segment's start does not move forward.
fn format_transcript(output: &Path, label: &str, response: TranscriptionResponse) -> String {
    let body = match response.chunks {
        Some(segments) => {
            let mut lines: Vec<String> = Vec::new();
            let mut last_start = 0.0;
            for segment in segments {
                lines.push(segment.text);
                let start = segment.timestamp[0];
                if start <= last_start {
                    lines.push(String::new());
                }
                last_start = start;
            }
            lines.join("\n")
        }
        None => response.text,
    };

    format!(
        "{rule}\n{}\n{}\n{rule}\n\n{} \n\n\n",
        output.display(),
        label,
        body,
        rule = HEADER_RULE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_response_is_wrapped_in_header() {
        let response = TranscriptionResponse {
            text: "Bonjour à tous".to_string(),
            chunks: None,
        };
        let text = format_transcript(
            Path::new("out/talk-chunk-000.txt"),
            "Audio from 0 to 10 minutes",
            response,
        );

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER_RULE);
        assert_eq!(lines[1], "out/talk-chunk-000.txt");
        assert_eq!(lines[2], "Audio from 0 to 10 minutes");
        assert_eq!(lines[3], HEADER_RULE);
        assert_eq!(lines[5], "Bonjour à tous ");
    }

    #[test]
    fn restarting_timestamps_insert_blank_line() {
        let response = TranscriptionResponse {
            text: String::new(),
            chunks: Some(vec![
                TimedSegment {
                    timestamp: [1.0, 2.0],
                    text: "one".to_string(),
                },
                TimedSegment {
                    timestamp: [0.5, 1.0],
                    text: "two".to_string(),
                },
                TimedSegment {
                    timestamp: [2.0, 3.0],
                    text: "three".to_string(),
                },
            ]),
        };
        let text = format_transcript(Path::new("x.txt"), "label", response);
        assert!(text.contains("one\ntwo\n\nthree"));
    }
}
