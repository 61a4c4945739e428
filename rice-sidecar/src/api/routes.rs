use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{groups, health, recording, settings};
use super::state::AppState;
use super::websocket::ws_handler;

pub fn create_router(state: Arc<AppState>) -> Router {
    // The sidecar is only ever driven by the local desktop shell
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:1420"),
            HeaderValue::from_static("http://127.0.0.1:1420"),
            HeaderValue::from_static("tauri://localhost"),
            HeaderValue::from_static("https://tauri.localhost"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/health", get(health::health_check))
        // Recording endpoints
        .route("/recording/start", post(recording::start_recording))
        .route("/recording/:session_id/pause", post(recording::pause_recording))
        .route("/recording/:session_id/resume", post(recording::resume_recording))
        .route("/recording/:session_id/stop", post(recording::stop_recording))
        .route("/recording/:session_id/clear", post(recording::clear_recording))
        .route("/recording/:session_id/cancel", post(recording::cancel_recording))
        .route("/recording/:session_id/save", post(recording::save_recording))
        .route("/recording/:session_id/status", get(recording::get_recording_status))
        .route("/recording/:session_id/steps", get(recording::get_recording_steps))
        // Saved step groups
        .route("/groups", get(groups::list_groups))
        .route("/groups/:group_id", delete(groups::delete_group))
        .route("/groups/:group_id/steps", get(groups::get_group_steps))
        // Settings
        .route(
            "/settings/browser",
            get(settings::get_browser_settings).put(settings::update_browser_settings),
        )
        // WebSocket
        .route("/ws/:client_id", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
