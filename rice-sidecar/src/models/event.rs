use serde::{Deserialize, Serialize};

/// Input types that behave like free text fields
const TEXT_INPUT_TYPES: &[&str] = &[
    "", "text", "email", "password", "search", "tel", "url", "number", "date",
    "datetime-local", "month", "time", "week",
];

/// One step of an element's path from the document root, e.g. `div[2]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XPathSegment {
    pub tag: String,
    pub index: u32,
}

/// Description of a DOM element as seen by the page script at capture time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Per-document identity of the element (`<page id>:<n>`)
    pub key: String,
    /// Tag name as reported by the DOM (upper-case for HTML documents)
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    /// `data-*` attributes in document order
    #[serde(default)]
    pub data_attributes: Vec<(String, String)>,
    #[serde(default)]
    pub input_type: Option<String>,
    /// innerText || value || placeholder
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub xpath: Vec<XPathSegment>,
}

impl ElementSnapshot {
    pub fn tag_lower(&self) -> String {
        self.tag.to_lowercase()
    }

    /// True for `textarea` and for `input`s whose type takes free text
    pub fn is_text_field(&self) -> bool {
        match self.tag_lower().as_str() {
            "textarea" => true,
            "input" => {
                let input_type = self
                    .input_type
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase();
                TEXT_INPUT_TYPES.contains(&input_type.as_str())
            }
            _ => false,
        }
    }

    pub fn is_select(&self) -> bool {
        self.tag_lower() == "select"
    }

    pub fn is_file_input(&self) -> bool {
        self.tag_lower() == "input"
            && self
                .input_type
                .as_deref()
                .map(|t| t.eq_ignore_ascii_case("file"))
                .unwrap_or(false)
    }
}

/// Raw DOM signal kinds pushed by the page script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Click,
    Input,
    Blur,
    Change,
    /// Pushed on `beforeunload` and on an explicit host flush
    Flush,
}

/// The focused text field at the moment of a click or flush
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusedField {
    pub element: ElementSnapshot,
    #[serde(default)]
    pub value: String,
}

/// A raw interaction signal drained from the page buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSignal {
    pub seq: u64,
    pub kind: SignalKind,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub element: Option<ElementSnapshot>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    #[serde(default)]
    pub focused: Option<FocusedField>,
    #[serde(default)]
    pub timestamp: i64,
    /// Signal restored from the previous document of the tab
    #[serde(default)]
    pub carried: bool,
}

/// Result of one `drain` call against the page session object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainResponse {
    pub page_id: String,
    pub url: String,
    pub cursor: u64,
    #[serde(default)]
    pub events: Vec<PageSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Click,
    TextInput,
    SelectOption,
    FileUpload,
    Navigate,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Click => "Click",
            EventKind::TextInput => "TextInput",
            EventKind::SelectOption => "SelectOption",
            EventKind::FileUpload => "FileUpload",
            EventKind::Navigate => "Navigate",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    #[default]
    None,
    ElementVisible,
    ElementClickable,
    PageLoad,
}

impl WaitCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitCondition::None => "none",
            WaitCondition::ElementVisible => "element_visible",
            WaitCondition::ElementClickable => "element_clickable",
            WaitCondition::PageLoad => "page_load",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

/// A user action recognized from page signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedEvent {
    pub kind: EventKind,
    pub selector_primary: String,
    #[serde(default)]
    pub selector_alternatives: Vec<String>,
    /// Display text of the element
    #[serde(default)]
    pub text: String,
    /// Typed text, selected option, file names or URL
    #[serde(default)]
    pub value: String,
    pub element_type: String,
    pub tag_name: String,
    pub timestamp_ms: i64,
    pub wait_condition: WaitCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl CapturedEvent {
    /// Synthetic event emitted when the recorded tab changes URL
    pub fn navigate(url: &str, timestamp_ms: i64) -> Self {
        Self {
            kind: EventKind::Navigate,
            selector_primary: url.to_string(),
            selector_alternatives: vec![],
            text: String::new(),
            value: url.to_string(),
            element_type: "page".to_string(),
            tag_name: String::new(),
            timestamp_ms,
            wait_condition: WaitCondition::PageLoad,
            coordinates: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(input_type: Option<&str>) -> ElementSnapshot {
        ElementSnapshot {
            tag: "INPUT".to_string(),
            input_type: input_type.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_field_detection() {
        assert!(input(Some("text")).is_text_field());
        assert!(input(Some("password")).is_text_field());
        assert!(input(None).is_text_field());
        assert!(!input(Some("submit")).is_text_field());
        assert!(!input(Some("checkbox")).is_text_field());
        assert!(!input(Some("file")).is_text_field());

        let textarea = ElementSnapshot {
            tag: "TEXTAREA".to_string(),
            ..Default::default()
        };
        assert!(textarea.is_text_field());
    }

    #[test]
    fn test_page_signal_parses_page_payload() {
        let payload = serde_json::json!({
            "seq": 3,
            "kind": "click",
            "url": "https://fsm.example/login",
            "element": {
                "key": "p1:4",
                "tag": "BUTTON",
                "id": "submit",
                "data_attributes": [["data-test", "go"]],
                "text": "Sign in",
                "xpath": [{"tag": "html", "index": 1}, {"tag": "button", "index": 1}]
            },
            "x": 10,
            "y": 20,
            "timestamp": 1700000000000i64
        });

        let signal: PageSignal = serde_json::from_value(payload).unwrap();
        assert_eq!(signal.kind, SignalKind::Click);
        let element = signal.element.unwrap();
        assert_eq!(element.id.as_deref(), Some("submit"));
        assert_eq!(element.data_attributes[0].0, "data-test");
        assert!(!signal.carried);
        assert!(signal.focused.is_none());
    }
}
