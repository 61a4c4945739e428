//! Integration tests for the recording system against a real browser.
//!
//! These launch headless Chrome (or Edge) and drive the fixture page through
//! DOM events, so they are ignored by default.
//!
//! Run with: cargo test --test recording_integration -- --ignored --test-threads=1

use std::time::Duration;
use tokio::time::sleep;
use url::Url;

use rice_sidecar::browser::ScriptHost;
use rice_sidecar::config::{ExecutablePaths, RecordingConfig};
use rice_sidecar::models::{BrowserSettings, RecordedStep};
use rice_sidecar::recording::BrowserRecorder;

fn test_page_url() -> Url {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Url::parse(&format!("file://{}/tests/fixtures/test_page.html", manifest_dir)).unwrap()
}

async fn start_recorder() -> BrowserRecorder {
    let config = RecordingConfig {
        poll_interval: Duration::from_millis(200),
        ..Default::default()
    };
    let recorder = BrowserRecorder::new(
        "integration".to_string(),
        &test_page_url(),
        config,
        ExecutablePaths::default(),
    );
    let settings = BrowserSettings {
        headless: true,
        ..Default::default()
    };
    recorder.start(&settings).await.unwrap();
    // Wait for page load + script injection
    sleep(Duration::from_millis(1000)).await;
    recorder
}

async fn run(recorder: &BrowserRecorder, script: &str) {
    recorder.browser.evaluate(script).await.unwrap();
    // Poll interval + buffer
    sleep(Duration::from_millis(600)).await;
}

fn summary(steps: &[RecordedStep]) -> Vec<(String, String, String)> {
    steps
        .iter()
        .map(|s| (s.action.clone(), s.target.clone(), s.value.clone()))
        .collect()
}

#[tokio::test]
#[ignore = "requires a local Chrome or Edge"]
async fn test_login_flow_is_recorded_in_order() {
    let recorder = start_recorder().await;

    run(
        &recorder,
        r#"
        const u = document.querySelector('#username');
        u.focus();
        for (const v of ['a', 'al', 'ali', 'alic', 'alice']) {
            u.value = v;
            u.dispatchEvent(new Event('input', { bubbles: true }));
        }
        u.blur();
        document.querySelector('#submit').click();
        true
        "#,
    )
    .await;

    recorder.stop().await.unwrap();
    let steps = recorder.steps().await;

    assert_eq!(
        summary(&steps),
        vec![
            ("TextInput".to_string(), "#username".to_string(), "alice".to_string()),
            ("Click".to_string(), "#submit".to_string(), String::new()),
        ]
    );
    assert_eq!(steps[0].step_id, 1);
    assert_eq!(steps[1].step_id, 2);
}

#[tokio::test]
#[ignore = "requires a local Chrome or Edge"]
async fn test_select_and_hash_navigation() {
    let recorder = start_recorder().await;

    run(
        &recorder,
        r#"
        const s = document.querySelector('#region');
        s.value = 'eu';
        s.dispatchEvent(new Event('change', { bubbles: true }));
        true
        "#,
    )
    .await;
    run(&recorder, "location.hash = 'next'; true").await;

    recorder.stop().await.unwrap();
    let steps = recorder.steps().await;

    assert_eq!(steps.len(), 2, "got {:?}", summary(&steps));
    assert_eq!(steps[0].action, "SelectOption");
    assert_eq!(steps[0].target, "#region");
    assert_eq!(steps[0].value, "Europe");
    assert_eq!(steps[1].action, "Navigate");
    assert!(steps[1].value.ends_with("#next"));
}

#[tokio::test]
#[ignore = "requires a local Chrome or Edge"]
async fn test_value_in_focused_field_survives_stop() {
    let recorder = start_recorder().await;

    run(
        &recorder,
        r#"
        const n = document.querySelector('#notes');
        n.focus();
        n.value = 'left unfinished';
        n.dispatchEvent(new Event('input', { bubbles: true }));
        true
        "#,
    )
    .await;

    recorder.stop().await.unwrap();
    let steps = recorder.steps().await;

    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].action, "TextInput");
    assert_eq!(steps[0].target, "#notes");
    assert_eq!(steps[0].value, "left unfinished");
}

#[tokio::test]
#[ignore = "requires a local Chrome or Edge"]
async fn test_paused_interactions_are_not_recorded() {
    let recorder = start_recorder().await;

    recorder.pause().await.unwrap();
    run(&recorder, "document.querySelector('#remember').click(); true").await;
    recorder.resume().await.unwrap();
    run(&recorder, "document.querySelector('.menu span').click(); true").await;

    recorder.stop().await.unwrap();
    let steps = recorder.steps().await;

    assert_eq!(steps.len(), 1, "got {:?}", summary(&steps));
    assert_eq!(steps[0].action, "Click");
    assert_eq!(steps[0].target, "span");
}
