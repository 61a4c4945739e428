use base64::Engine;
use serde::{Deserialize, Serialize, Serializer};

/// A step captured during a recording session, in capture order
#[derive(Debug, Clone, Serialize)]
pub struct RecordedStep {
    /// 1-based ordinal shown as "Step N"
    pub step_id: u32,
    pub action: String,
    pub target: String,
    pub value: String,
    pub alternatives: Vec<String>,
    pub wait_condition: String,
    pub element_type: String,
    /// PNG bytes, serialized as base64
    #[serde(
        serialize_with = "serialize_screenshot",
        skip_serializing_if = "Option::is_none"
    )]
    pub screenshot_before: Option<Vec<u8>>,
    pub timestamp_ms: i64,
}

fn serialize_screenshot<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match bytes {
        Some(b) => serializer.serialize_some(&base64::engine::general_purpose::STANDARD.encode(b)),
        None => serializer.serialize_none(),
    }
}

impl RecordedStep {
    /// Persisted step name, e.g. "Step 2: Click"
    pub fn display_name(&self, order: usize) -> String {
        format!("Step {}: {}", order, self.action)
    }

    /// Human readable description stored alongside the step
    pub fn describe(&self) -> String {
        match self.action.as_str() {
            "Click" => format!("Click on {}", self.target),
            "TextInput" => format!("Enter '{}' into {}", self.value, self.target),
            "SelectOption" => format!("Select '{}' from {}", self.value, self.target),
            "FileUpload" => format!("Upload '{}' via {}", self.value, self.target),
            "Navigate" => format!("Navigate to {}", self.value),
            other if self.value.is_empty() => format!("{} on {}", other, self.target),
            other => format!("{} '{}' on {}", other, self.value, self.target),
        }
    }
}

/// Live counters shown while recording
#[derive(Debug, Clone, Serialize)]
pub struct RecordingMetrics {
    pub step_count: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
}

/// Save request for the steps currently held by a recording
#[derive(Debug, Clone, Deserialize)]
pub struct SaveRecording {
    pub user_id: i64,
    #[serde(default)]
    pub rice_profile_id: Option<i64>,
    pub group_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A persisted named group of test steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStepGroup {
    pub id: i64,
    pub user_id: i64,
    pub group_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
}

/// A persisted test step belonging to a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rice_profile_id: Option<i64>,
    pub group_id: i64,
    pub name: String,
    pub step_type: String,
    pub target: String,
    pub description: String,
    pub step_order: i64,
    pub value: String,
    pub alternatives: Vec<String>,
    pub wait_condition: String,
    pub created_at: String,
}
