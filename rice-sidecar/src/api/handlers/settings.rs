use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::BrowserSettings;

use super::super::state::AppState;

pub async fn get_browser_settings(State(state): State<Arc<AppState>>) -> Result<Json<BrowserSettings>> {
    Ok(Json(state.repository.browser_settings(&state.config.browser)?))
}

/// Replace the stored browser settings used by later recordings
pub async fn update_browser_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<BrowserSettings>,
) -> Result<Json<BrowserSettings>> {
    if settings.window_width == 0 || settings.window_height == 0 {
        return Err(AppError::ValidationError(
            "Window width and height must be positive".to_string(),
        ));
    }
    state.repository.save_browser_settings(&settings)?;
    Ok(Json(settings))
}
