use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    GenericResponse, SaveRecording, SaveRecordingResponse, SessionStatusResponse,
    StartRecordingRequest, StartRecordingResponse, StepsResponse,
};
use crate::recording::{validate_start_url, BrowserRecorder};

use super::super::state::{ActiveRecorder, AppState, WsEvent};

fn recording_error(e: anyhow::Error) -> AppError {
    AppError::RecordingError(e.to_string())
}

async fn status_response(recorder: &BrowserRecorder) -> Json<SessionStatusResponse> {
    Json(SessionStatusResponse {
        session: recorder.session().await,
        metrics: recorder.metrics().await,
    })
}

/// Start a new browser recording session
///
/// Returns immediately with status "initializing" and launches the browser in
/// the background. Clients follow `recording_status` messages or poll the
/// status endpoint until the session is "recording" or "error".
pub async fn start_recording(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRecordingRequest>,
) -> Result<Json<StartRecordingResponse>> {
    let start_url = validate_start_url(request.start_url.as_deref().unwrap_or_default())?;

    // Acquire global recording lock to prevent race conditions (double browser)
    let _recording_guard = state.recording_lock.lock().await;

    let existing_sessions: Vec<String> = state.recordings.iter().map(|r| r.key().clone()).collect();
    for session_id in existing_sessions {
        if let Some((_, active)) = state.recordings.remove(&session_id) {
            tracing::warn!("Cancelling existing recording session: {}", session_id);
            if let Err(e) = active.recorder.cancel().await {
                tracing::warn!("Failed to cancel session {}: {}", session_id, e);
            }
        }
    }

    let settings = state
        .repository
        .browser_settings(&state.config.browser)?
        .with_overrides(&request.browser);

    let session_id = Uuid::new_v4().to_string();
    let recorder = Arc::new(BrowserRecorder::new(
        session_id.clone(),
        &start_url,
        state.config.recording.clone(),
        state.config.executables.clone(),
    ));

    state.recordings.insert(
        session_id.clone(),
        ActiveRecorder {
            recorder: Arc::clone(&recorder),
            client_id: request.client_id.clone(),
        },
    );

    tracing::info!(
        "Created recording session {} (initializing) for {} in {}",
        session_id,
        start_url,
        settings.browser.as_str()
    );

    let state_clone = Arc::clone(&state);
    let sid = session_id.clone();
    tokio::spawn(async move {
        // Forward steps to WebSocket clients for as long as the recorder lives
        let mut step_rx = recorder.subscribe_steps().await;
        let ws_broadcast = state_clone.ws_broadcast.clone();
        let sid_inner = sid.clone();
        tokio::spawn(async move {
            while let Ok(step) = step_rx.recv().await {
                let _ = ws_broadcast.send(WsEvent::RecordingStep {
                    session_id: sid_inner.clone(),
                    step,
                });
            }
        });

        match recorder.start(&settings).await {
            Ok(kind) => {
                tracing::info!("Recording session {} is now active in {}", sid, kind.as_str());
            }
            Err(e) => {
                let error = AppError::BrowserError(e.to_string());
                tracing::error!("Failed to start recording for session {}: {}", sid, error);
                state_clone.broadcast(WsEvent::Error {
                    session_id: sid.clone(),
                    error: error.to_string(),
                });
            }
        }
        state_clone.broadcast_status(&recorder).await;
    });

    Ok(Json(StartRecordingResponse {
        session_id,
        status: "initializing".to_string(),
    }))
}

pub async fn pause_recording(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusResponse>> {
    let recorder = state.recorder(&session_id)?;
    recorder.pause().await.map_err(recording_error)?;
    state.broadcast_status(&recorder).await;
    Ok(status_response(&recorder).await)
}

pub async fn resume_recording(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusResponse>> {
    let recorder = state.recorder(&session_id)?;
    recorder.resume().await.map_err(recording_error)?;
    state.broadcast_status(&recorder).await;
    Ok(status_response(&recorder).await)
}

/// Stop capturing. The session stays addressable so its steps can be saved.
pub async fn stop_recording(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusResponse>> {
    let recorder = state.recorder(&session_id)?;
    let step_count = recorder.stop().await.map_err(recording_error)?;
    tracing::info!("Stopped recording session {} ({} steps)", session_id, step_count);
    state.broadcast_status(&recorder).await;
    Ok(status_response(&recorder).await)
}

pub async fn clear_recording(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<GenericResponse>> {
    state.recorder(&session_id)?.clear().await;
    Ok(Json(GenericResponse {
        status: "cleared".to_string(),
    }))
}

/// Cancel a recording session without saving
pub async fn cancel_recording(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<GenericResponse>> {
    let (_, active) = state
        .recordings
        .remove(&session_id)
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    active.recorder.cancel().await.map_err(recording_error)?;
    state.broadcast_status(&active.recorder).await;
    tracing::info!("Cancelled recording session {}", session_id);

    Ok(Json(GenericResponse {
        status: "cancelled".to_string(),
    }))
}

/// Save the recorded steps as a named group.
///
/// A duplicate group name is a 409 and the steps stay in memory for a retry
/// under another name.
pub async fn save_recording(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<SaveRecording>,
) -> Result<Json<SaveRecordingResponse>> {
    let recorder = state.recorder(&session_id)?;
    let (group, step_count) = recorder.save(&state.repository, &request).await?;
    tracing::info!(
        "Recording {} saved as group '{}' ({} steps)",
        session_id,
        group.group_name,
        step_count
    );
    Ok(Json(SaveRecordingResponse { group, step_count }))
}

pub async fn get_recording_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusResponse>> {
    let recorder = state.recorder(&session_id)?;
    Ok(status_response(&recorder).await)
}

pub async fn get_recording_steps(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<StepsResponse>> {
    let recorder = state.recorder(&session_id)?;
    Ok(Json(StepsResponse {
        session_id,
        steps: recorder.steps().await,
    }))
}
