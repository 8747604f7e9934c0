//! HTTP API for driving transcription runs
//!
//! This module provides a REST API over one shared orchestrator:
//! - POST /runs - Start a run (202; 409 while another run is active)
//! - POST /runs/cancel - Request cancellation of the active run
//! - GET /runs/status - Phase, elapsed time and fusion availability
//! - GET /runs/events - Progress events as server-sent events
//! - POST /fusion - Merge the last run's transcripts
//! - GET /settings, PUT /settings - Persisted settings
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
