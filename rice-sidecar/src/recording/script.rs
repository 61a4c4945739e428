//! Page-side recorder script and the small host calls made against it.
//!
//! The script lives in `scripts/recorder.js` so it can be edited as
//! JavaScript; it is bundled into the binary at compile time.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{DrainResponse, PageSignal};

/// Installs `window.__riceRecorder` once per document and returns its page id
pub const RECORDER_SCRIPT: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/scripts/recorder.js"));

/// Ask the page for the focused field's value so it is not lost on stop
pub const FLUSH_SCRIPT: &str =
    "window.__riceRecorder ? window.__riceRecorder.flush() : null";

/// Fetch signals newer than `cursor`; evaluates to `null` when the script is missing
pub fn drain_script(page_id: Option<&str>, cursor: u64) -> String {
    let page = serde_json::to_string(page_id.unwrap_or("")).unwrap_or_else(|_| "\"\"".into());
    format!(
        "window.__riceRecorder ? window.__riceRecorder.drain({}, {}) : null",
        page, cursor
    )
}

pub fn set_active_script(active: bool) -> String {
    format!(
        "window.__riceRecorder ? window.__riceRecorder.setActive({}) : false",
        active
    )
}

/// Drain envelope with signals left undecoded so one bad signal can be skipped
#[derive(Deserialize)]
struct RawDrain {
    page_id: String,
    url: String,
    cursor: u64,
    #[serde(default)]
    events: Vec<Value>,
}

/// Parse a drain result. `Ok(None)` means the page has no recorder installed.
///
/// Signals that fail to decode are logged and dropped; the cursor still
/// moves past them so the page does not resend them.
pub fn parse_drain(value: Value) -> Result<Option<DrainResponse>> {
    if value.is_null() {
        return Ok(None);
    }
    let raw: RawDrain =
        serde_json::from_value(value).map_err(|e| anyhow!("Malformed drain response: {}", e))?;

    let events = raw
        .events
        .into_iter()
        .filter_map(|signal| match serde_json::from_value::<PageSignal>(signal) {
            Ok(signal) => Some(signal),
            Err(e) => {
                tracing::warn!("Skipping malformed page signal: {}", e);
                None
            }
        })
        .collect();

    Ok(Some(DrainResponse {
        page_id: raw.page_id,
        url: raw.url,
        cursor: raw.cursor,
        events,
    }))
}
