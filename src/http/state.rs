use crate::run::{BroadcastSink, TranscriptionOrchestrator};
use crate::settings::SettingsStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single orchestrator every request drives
    pub orchestrator: TranscriptionOrchestrator,

    /// Persisted user settings
    pub settings: Arc<RwLock<SettingsStore>>,

    /// Source of the `/runs/events` stream; must also be wired into the
    /// orchestrator's sink
    pub events: BroadcastSink,
}

impl AppState {
    pub fn new(
        orchestrator: TranscriptionOrchestrator,
        settings: SettingsStore,
        events: BroadcastSink,
    ) -> Self {
        Self {
            orchestrator,
            settings: Arc::new(RwLock::new(settings)),
            events,
        }
    }
}
