use crate::run::ProgressEvent;
use serde::{Deserialize, Serialize};

/// Progress event published to NATS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub service: String,
    pub timestamp: String, // RFC3339 timestamp
    pub event: ProgressEvent,
}
