use anyhow::{Context, Result};
use async_nats::Client;
use async_trait::async_trait;
use tracing::{error, info};

use super::messages::ProgressMessage;
use crate::run::{ProgressEvent, ProgressSink};

pub struct NatsClient {
    client: Client,
    service: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, service: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, service })
    }

    /// Publish one progress event under `<subject>.<run_id>` (or
    /// `<subject>.fusion` for events outside any run)
    pub async fn publish_progress(&self, subject_prefix: &str, event: ProgressEvent) -> Result<()> {
        let subject = match event.run_id() {
            Some(run_id) => format!("{}.{}", subject_prefix, run_id),
            None => format!("{}.fusion", subject_prefix),
        };

        let message = ProgressMessage {
            service: self.service.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            event,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish progress event")?;

        info!("Published progress event to {}", subject);

        Ok(())
    }
}

/// Progress sink publishing every event to NATS
pub struct NatsProgressSink {
    client: NatsClient,
    subject: String,
}

impl NatsProgressSink {
    pub fn new(client: NatsClient, subject: impl Into<String>) -> Self {
        Self {
            client,
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl ProgressSink for NatsProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        if let Err(e) = self.client.publish_progress(&self.subject, event).await {
            error!("Failed to publish progress event: {:#}", e);
        }
    }
}
