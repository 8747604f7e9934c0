use super::state::AppState;
use crate::run::{format_elapsed, RunError};
use crate::session::Session;
use crate::settings::{Settings, SettingsStore};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    pub session_name: String,

    pub file_path: PathBuf,

    /// Overrides the stored chunk duration for this run only
    pub chunk_duration: Option<u32>,

    /// Overrides the stored language for this run only
    pub language: Option<String>,

    /// Overrides the stored proxy preference for this run only
    pub no_proxy: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct StartRunResponse {
    pub run_id: Uuid,
    pub session_name: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CancelRunResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: crate::run::OrchestratorStatus,
    /// Elapsed time as MM:SS
    pub elapsed: String,
}

#[derive(Debug, Serialize)]
pub struct FusionResponse {
    pub output_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub chunk_duration: Option<u32>,
    pub language: Option<String>,
    pub no_proxy: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn run_error_response(err: RunError) -> Response {
    let status = match &err {
        RunError::AlreadyRunning | RunError::FusionUnavailable => StatusCode::CONFLICT,
        RunError::Split(_) | RunError::Fusion(_) | RunError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /runs
/// Validate the session and start a run in the background
pub async fn start_run(
    State(state): State<AppState>,
    Json(req): Json<StartRunRequest>,
) -> Response {
    let session = {
        let store = state.settings.read().await;
        let settings = store.settings();
        Session::with_options(
            req.session_name,
            req.file_path,
            req.chunk_duration.unwrap_or(settings.chunk_duration),
            req.language.unwrap_or_else(|| settings.language.clone()),
            !req.no_proxy.unwrap_or(settings.no_proxy),
        )
    };

    let session = match session {
        Ok(session) => session,
        Err(e) => {
            warn!("Rejected run request: {}", e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let pending = match state.orchestrator.prepare_run(session) {
        Ok(pending) => pending,
        Err(e) => return run_error_response(e),
    };

    let run_id = pending.run_id();
    let session_name = pending.session().name.clone();
    info!("Starting run {} for session {}", run_id, session_name);

    tokio::spawn(async move {
        match pending.run().await {
            Ok(report) => info!("Run {}: {}", report.run_id, report.summary()),
            Err(e) => error!("Run {} failed: {}", run_id, e),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(StartRunResponse {
            run_id,
            session_name,
            status: "started".to_string(),
        }),
    )
        .into_response()
}

/// POST /runs/cancel
/// Request cancellation; the chunk in flight still completes
pub async fn cancel_run(State(state): State<AppState>) -> Response {
    if state.orchestrator.request_cancel() {
        (
            StatusCode::ACCEPTED,
            Json(CancelRunResponse {
                status: "cancelling".to_string(),
                message: "No further chunks will be sent".to_string(),
            }),
        )
            .into_response()
    } else {
        error_response(StatusCode::CONFLICT, "No active run")
    }
}

/// GET /runs/status
pub async fn run_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.orchestrator.status().await;
    let elapsed = format_elapsed(Duration::from_secs(status.elapsed_secs));
    (StatusCode::OK, Json(StatusResponse { status, elapsed }))
}

/// GET /runs/events
/// Progress events as server-sent events
pub async fn run_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = state
        .events
        .stream()
        .map(|event| Event::default().json_data(event));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// POST /fusion
/// Merge the transcripts of the last completed run
pub async fn fuse_transcripts(State(state): State<AppState>) -> Response {
    match state.orchestrator.fuse().await {
        Ok(output_path) => (StatusCode::OK, Json(FusionResponse { output_path })).into_response(),
        Err(e) => {
            error!("Fusion failed: {}", e);
            run_error_response(e)
        }
    }
}

/// GET /settings
pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings.read().await.settings().clone())
}

/// PUT /settings
/// Update any subset of the settings; each change is persisted immediately
pub async fn update_settings(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Response {
    let mut store = state.settings.write().await;
    let result = apply_settings(&mut store, &req);

    match result {
        Ok(()) => (StatusCode::OK, Json(store.settings().clone())).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, format!("{:#}", e)),
    }
}

fn apply_settings(store: &mut SettingsStore, req: &UpdateSettingsRequest) -> anyhow::Result<()> {
    if let Some(minutes) = req.chunk_duration {
        store.set_chunk_duration(minutes)?;
    }
    if let Some(language) = req.language.as_deref() {
        store.set_language(language)?;
    }
    if let Some(no_proxy) = req.no_proxy {
        store.set_no_proxy(no_proxy)?;
    }
    Ok(())
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
