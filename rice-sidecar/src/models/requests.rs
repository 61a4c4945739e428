use serde::Deserialize;

use super::settings::BrowserOverrides;

#[derive(Debug, Deserialize)]
pub struct StartRecordingRequest {
    /// Page the recorded tab opens on
    pub start_url: Option<String>,
    #[serde(flatten)]
    pub browser: BrowserOverrides,
    /// Optional client ID for tracking which client started the recording
    /// Used for cleanup when client disconnects
    pub client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GroupListQuery {
    pub user_id: i64,
}
