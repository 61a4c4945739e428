use serde::Serialize;

use super::session::RecordingSession;
use super::step::{RecordedStep, RecordingMetrics, TestStepGroup};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_recordings: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session: RecordingSession,
    pub metrics: RecordingMetrics,
}

#[derive(Debug, Serialize)]
pub struct StepsResponse {
    pub session_id: String,
    pub steps: Vec<RecordedStep>,
}

#[derive(Debug, Serialize)]
pub struct SaveRecordingResponse {
    pub group: TestStepGroup,
    pub step_count: usize,
}

#[derive(Debug, Serialize)]
pub struct GenericResponse {
    pub status: String,
}
