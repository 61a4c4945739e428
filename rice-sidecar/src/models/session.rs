use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::settings::BrowserKind;

/// Lifecycle of a recording session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Initializing,
    Recording,
    Paused,
    Stopped,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::Recording => "recording",
            SessionStatus::Paused => "paused",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Error => "error",
        }
    }

    /// Whether the page listeners should currently buffer interactions
    pub fn is_capturing(&self) -> bool {
        matches!(self, SessionStatus::Recording)
    }
}

impl FromStr for SessionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(SessionStatus::Initializing),
            "recording" => Ok(SessionStatus::Recording),
            "paused" => Ok(SessionStatus::Paused),
            "stopped" => Ok(SessionStatus::Stopped),
            "error" => Ok(SessionStatus::Error),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSession {
    pub id: String,
    pub start_url: String,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    pub fn new(id: String, start_url: String) -> Self {
        Self {
            id,
            start_url,
            status: SessionStatus::Initializing,
            browser: None,
            error: None,
            started_at: Utc::now(),
            stopped_at: None,
        }
    }

    pub fn start(&mut self, browser: BrowserKind) {
        self.status = SessionStatus::Recording;
        self.browser = Some(browser);
    }

    pub fn pause(&mut self) {
        self.status = SessionStatus::Paused;
    }

    pub fn resume(&mut self) {
        self.status = SessionStatus::Recording;
    }

    pub fn stop(&mut self) {
        self.status = SessionStatus::Stopped;
        self.stopped_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.status = SessionStatus::Error;
        self.error = Some(error);
        self.stopped_at = Some(Utc::now());
    }
}
