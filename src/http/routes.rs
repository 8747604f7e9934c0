use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Run control
        .route("/runs", post(handlers::start_run))
        .route("/runs/cancel", post(handlers::cancel_run))
        .route("/runs/status", get(handlers::run_status))
        .route("/runs/events", get(handlers::run_events))
        // Fusion
        .route("/fusion", post(handlers::fuse_transcripts))
        // Settings
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .layer(
            ServiceBuilder::new()
                // Request logging
                .layer(TraceLayer::new_for_http())
                // The desktop front end is served from its own origin
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
