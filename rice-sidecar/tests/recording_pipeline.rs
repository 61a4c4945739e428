//! End-to-end tests of the recording pipeline against a scripted page.
//!
//! The fake host answers drain calls from a queue of canned page responses,
//! so these run without a browser.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use url::Url;

use rice_sidecar::browser::ScriptHost;
use rice_sidecar::config::{ExecutablePaths, RecordingConfig};
use rice_sidecar::error::AppError;
use rice_sidecar::models::{BrowserKind, RecordedStep, SaveRecording, SessionStatus};
use rice_sidecar::recording::BrowserRecorder;
use rice_sidecar::store::StepRepository;

/// A page that hands out queued drain responses, then idles on the last page
struct ScriptedPage {
    drains: Mutex<VecDeque<Value>>,
    idle: Mutex<Value>,
    scripts: Mutex<Vec<String>>,
}

impl ScriptedPage {
    fn new(drains: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            drains: Mutex::new(drains.into()),
            idle: Mutex::new(json!({"page_id": "p1", "url": "https://fsm.example/login", "cursor": 0, "events": []})),
            scripts: Mutex::new(Vec::new()),
        })
    }

    fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptHost for ScriptedPage {
    async fn navigate(&self, _url: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> anyhow::Result<Value> {
        self.scripts.lock().unwrap().push(script.to_string());
        if !script.contains(".drain(") {
            return Ok(Value::Bool(true));
        }

        let next = self.drains.lock().unwrap().pop_front();
        match next {
            Some(drain) => {
                let mut idle = drain.clone();
                idle["events"] = json!([]);
                *self.idle.lock().unwrap() = idle;
                Ok(drain)
            }
            None => Ok(self.idle.lock().unwrap().clone()),
        }
    }

    async fn screenshot(&self) -> anyhow::Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

fn username(page: &str) -> Value {
    json!({
        "key": format!("{}:1", page), "tag": "INPUT", "id": "username", "name": "user",
        "input_type": "text", "text": "",
        "xpath": [{"tag": "html", "index": 1}, {"tag": "body", "index": 1}, {"tag": "input", "index": 1}]
    })
}

fn submit(page: &str) -> Value {
    json!({
        "key": format!("{}:2", page), "tag": "BUTTON", "id": "submit", "input_type": "submit",
        "text": "Sign in", "class_name": "btn primary"
    })
}

fn signal(seq: u64, kind: &str, url: &str, element: Value, value: Option<&str>) -> Value {
    json!({"seq": seq, "kind": kind, "url": url, "element": element, "value": value, "timestamp": seq})
}

/// Typing "alice" keystroke by keystroke, leaving the field, then clicking submit
fn login_drain() -> Value {
    let url = "https://fsm.example/login";
    json!({
        "page_id": "p1",
        "url": url,
        "cursor": 5,
        "events": [
            signal(1, "input", url, username("p1"), Some("a")),
            signal(2, "input", url, username("p1"), Some("al")),
            signal(3, "input", url, username("p1"), Some("alice")),
            signal(4, "blur", url, username("p1"), Some("alice")),
            signal(5, "click", url, submit("p1"), None),
        ]
    })
}

fn recorder() -> BrowserRecorder {
    let config = RecordingConfig {
        poll_interval: Duration::from_millis(10),
        poll_backoff: Duration::from_millis(10),
        capture_screenshots: false,
    };
    let url = Url::parse("https://fsm.example/login").unwrap();
    BrowserRecorder::new("session-1".to_string(), &url, config, ExecutablePaths::default())
}

async fn wait_for_steps(recorder: &BrowserRecorder, count: usize) -> Vec<RecordedStep> {
    for _ in 0..200 {
        let steps = recorder.steps().await;
        if steps.len() >= count {
            return steps;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    recorder.steps().await
}

fn save(name: &str) -> SaveRecording {
    SaveRecording {
        user_id: 1,
        rice_profile_id: None,
        group_name: name.to_string(),
        description: None,
    }
}

#[tokio::test]
async fn test_typing_then_click_yields_two_steps() {
    let page = ScriptedPage::new(vec![login_drain()]);
    let recorder = recorder();
    recorder.attach(page.clone(), BrowserKind::Chrome).await.unwrap();
    assert_eq!(recorder.session().await.status, SessionStatus::Recording);

    let steps = wait_for_steps(&recorder, 2).await;
    recorder.stop().await.unwrap();
    let steps_after_stop = recorder.steps().await;

    assert_eq!(steps.len(), 2);
    assert_eq!(steps_after_stop.len(), 2, "stop must not add duplicates");

    assert_eq!(steps[0].step_id, 1);
    assert_eq!(steps[0].action, "TextInput");
    assert_eq!(steps[0].target, "#username");
    assert_eq!(steps[0].value, "alice");
    assert!(steps[0].alternatives.contains(&"[name=\"user\"]".to_string()));

    assert_eq!(steps[1].step_id, 2);
    assert_eq!(steps[1].action, "Click");
    assert_eq!(steps[1].target, "#submit");
    assert_eq!(steps[1].wait_condition, "element_clickable");

    assert!(page.scripts().iter().any(|s| s.contains("window.__riceRecorder = session")));
    assert_eq!(recorder.session().await.status, SessionStatus::Stopped);
}

#[tokio::test]
async fn test_navigation_after_submit_is_recorded() {
    let home = json!({"page_id": "p2", "url": "https://fsm.example/home", "cursor": 0, "events": []});
    let page = ScriptedPage::new(vec![login_drain(), home]);
    let recorder = recorder();
    recorder.attach(page, BrowserKind::Edge).await.unwrap();

    let steps = wait_for_steps(&recorder, 3).await;
    recorder.stop().await.unwrap();

    let actions: Vec<&str> = steps.iter().map(|s| s.action.as_str()).collect();
    assert_eq!(actions, vec!["TextInput", "Click", "Navigate"]);
    assert_eq!(steps[2].value, "https://fsm.example/home");
    assert_eq!(steps[2].wait_condition, "page_load");
}

#[tokio::test]
async fn test_value_typed_before_stop_is_flushed() {
    let url = "https://fsm.example/login";
    let typing = json!({
        "page_id": "p1", "url": url, "cursor": 1,
        "events": [signal(1, "input", url, username("p1"), Some("bob"))]
    });
    let page = ScriptedPage::new(vec![typing]);
    let recorder = recorder();
    recorder.attach(page.clone(), BrowserKind::Chrome).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(recorder.steps().await.is_empty(), "typing alone does not finish a step");

    recorder.stop().await.unwrap();
    let steps = recorder.steps().await;
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].action, "TextInput");
    assert_eq!(steps[0].value, "bob");
    assert!(page.scripts().iter().any(|s| s.contains(".flush()")));
}

#[tokio::test]
async fn test_pause_and_resume_toggle_page_capture() {
    let page = ScriptedPage::new(vec![]);
    let recorder = recorder();
    recorder.attach(page.clone(), BrowserKind::Chrome).await.unwrap();

    assert_ok!(recorder.pause().await);
    assert_eq!(recorder.session().await.status, SessionStatus::Paused);
    assert_err!(recorder.pause().await);

    assert_ok!(recorder.resume().await);
    assert_eq!(recorder.session().await.status, SessionStatus::Recording);

    let scripts = page.scripts();
    let pause_at = scripts.iter().position(|s| s.contains("setActive(false)")).unwrap();
    let resume_at = scripts.iter().position(|s| s.contains("setActive(true)")).unwrap();
    assert!(pause_at < resume_at);

    recorder.cancel().await.unwrap();
}

#[tokio::test]
async fn test_save_clears_steps_only_on_success() {
    let repository = StepRepository::in_memory().unwrap();
    repository.save_recording(&save("Login"), &[]).unwrap();

    let page = ScriptedPage::new(vec![login_drain()]);
    let recorder = recorder();
    recorder.attach(page, BrowserKind::Chrome).await.unwrap();
    wait_for_steps(&recorder, 2).await;
    recorder.stop().await.unwrap();

    let err = recorder.save(&repository, &save("Login")).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateGroup(_)));
    assert_eq!(recorder.steps().await.len(), 2, "steps kept for a retry");
    assert_eq!(repository.step_count().unwrap(), 0);

    let (group, saved) = recorder.save(&repository, &save("Login retry")).await.unwrap();
    assert_eq!(saved, 2);
    assert!(recorder.steps().await.is_empty());

    let stored = repository.steps_for_group(group.id).unwrap();
    let names: Vec<&str> = stored.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Step 1: TextInput", "Step 2: Click"]);
    assert_eq!(stored[0].description, "Enter 'alice' into #username");
}

#[tokio::test]
async fn test_cancel_discards_steps() {
    let page = ScriptedPage::new(vec![login_drain()]);
    let recorder = recorder();
    recorder.attach(page.clone(), BrowserKind::Chrome).await.unwrap();
    wait_for_steps(&recorder, 2).await;

    recorder.cancel().await.unwrap();
    assert!(recorder.steps().await.is_empty());

    // A cancelled recorder cannot be restarted
    assert_err!(recorder.attach(page, BrowserKind::Chrome).await);
}
