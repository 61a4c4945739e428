//! Fixed-interval bridge between the page buffer and the step recorder.
//!
//! The driver offers no push channel, so the poller drains the page session
//! object on a timer. It runs as a single task and is the only writer of the
//! step list while recording; cancellation ends the loop after a final flush.

use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::browser::ScriptHost;
use crate::config::RecordingConfig;
use crate::models::{CapturedEvent, DrainResponse};

use super::interceptor::Interceptor;
use super::script::{drain_script, parse_drain, set_active_script, FLUSH_SCRIPT, RECORDER_SCRIPT};
use super::step_recorder::StepRecorder;

pub struct Poller {
    host: Arc<dyn ScriptHost>,
    steps: Arc<Mutex<StepRecorder>>,
    /// Shared recording gate; false while paused
    capturing: Arc<AtomicBool>,
    config: RecordingConfig,
    interceptor: Interceptor,
    cursor: u64,
    page_id: Option<String>,
    last_url: Option<String>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl Poller {
    pub fn new(
        host: Arc<dyn ScriptHost>,
        steps: Arc<Mutex<StepRecorder>>,
        capturing: Arc<AtomicBool>,
        config: RecordingConfig,
    ) -> Self {
        Self {
            host,
            steps,
            capturing,
            config,
            interceptor: Interceptor::new(),
            cursor: 0,
            page_id: None,
            last_url: None,
        }
    }

    /// Poll until cancelled. A failed cycle is logged and retried after the backoff.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            "Poller started (interval {:?}, backoff {:?})",
            self.config.poll_interval,
            self.config.poll_backoff
        );

        loop {
            let delay = match self.poll_once().await {
                Ok(_) => self.config.poll_interval,
                Err(e) => {
                    tracing::warn!("Poll cycle failed, retrying: {}", e);
                    self.config.poll_backoff
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.finish().await;
        tracing::info!("Poller stopped");
    }

    /// One cycle: drain new signals, detect navigation, record resulting steps.
    /// Returns the number of steps recorded.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let value = self
            .host
            .evaluate(&drain_script(self.page_id.as_deref(), self.cursor))
            .await?;

        let Some(drained) = parse_drain(value)? else {
            tracing::debug!("Recorder script missing on page, injecting");
            self.host.evaluate(RECORDER_SCRIPT).await?;
            self.sync_gate().await?;
            return Ok(0);
        };

        let new_document = self.page_id.as_deref() != Some(drained.page_id.as_str());
        if !self.capturing.load(Ordering::SeqCst) {
            return self.skip_paused(drained, new_document).await;
        }

        let (carried, fresh): (Vec<_>, Vec<_>) = drained.events.iter().partition(|s| s.carried);

        let mut events = Vec::new();
        // Carried signals are the last words of the previous document
        for signal in carried {
            self.observe_url(&signal.url, signal.timestamp, &mut events);
            events.extend(self.interceptor.handle(signal));
        }
        if new_document && self.page_id.is_some() {
            tracing::debug!("New document {} at {}", drained.page_id, drained.url);
            events.extend(self.interceptor.flush_pending(now_ms()));
            self.interceptor.reset_document();
        }
        for signal in fresh {
            self.observe_url(&signal.url, signal.timestamp, &mut events);
            events.extend(self.interceptor.handle(signal));
        }
        self.observe_url(&drained.url, now_ms(), &mut events);

        self.cursor = drained.cursor;
        if new_document {
            self.page_id = Some(drained.page_id.clone());
            if let Err(e) = self.sync_gate().await {
                tracing::warn!("Could not sync pause state to new document: {}", e);
            }
        }

        let count = events.len();
        self.record(events).await;
        Ok(count)
    }

    /// While paused, signals are dropped and navigation is tracked without
    /// emitting steps. Input typed before the pause is still recorded.
    async fn skip_paused(&mut self, drained: DrainResponse, new_document: bool) -> Result<usize> {
        if !drained.events.is_empty() {
            tracing::debug!("Dropping {} signals captured while paused", drained.events.len());
        }
        let events = self.interceptor.flush_pending(now_ms());
        if new_document && self.page_id.is_some() {
            self.interceptor.reset_document();
        }
        if !drained.url.is_empty() {
            self.last_url = Some(drained.url.clone());
        }

        self.cursor = drained.cursor;
        if new_document {
            self.page_id = Some(drained.page_id);
            if let Err(e) = self.sync_gate().await {
                tracing::warn!("Could not sync pause state to new document: {}", e);
            }
        }

        let count = events.len();
        self.record(events).await;
        Ok(count)
    }

    /// Best-effort final cycle so the last typed value is not lost
    async fn finish(&mut self) {
        if let Err(e) = self.host.evaluate(FLUSH_SCRIPT).await {
            tracing::debug!("Final page flush failed: {}", e);
        }
        if let Err(e) = self.poll_once().await {
            tracing::warn!("Final poll cycle failed: {}", e);
        }
        let leftovers = self.interceptor.flush_pending(now_ms());
        self.record(leftovers).await;
    }

    fn observe_url(&mut self, url: &str, timestamp: i64, events: &mut Vec<CapturedEvent>) {
        if url.is_empty() {
            return;
        }
        match self.last_url.as_deref() {
            None => self.last_url = Some(url.to_string()),
            Some(last) if last == url => {}
            Some(last) => {
                tracing::info!("Navigation detected: {} -> {}", last, url);
                events.extend(self.interceptor.flush_pending(timestamp));
                events.push(CapturedEvent::navigate(url, timestamp));
                self.last_url = Some(url.to_string());
            }
        }
    }

    /// New documents start active; pause them if the session is paused
    async fn sync_gate(&self) -> Result<()> {
        if !self.capturing.load(Ordering::SeqCst) {
            self.host.evaluate(&set_active_script(false)).await?;
        }
        Ok(())
    }

    async fn record(&self, events: Vec<CapturedEvent>) {
        for event in events {
            let screenshot = if self.config.capture_screenshots {
                match self.host.screenshot().await {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        tracing::debug!("Screenshot for step failed: {}", e);
                        None
                    }
                }
            } else {
                None
            };
            self.steps.lock().await.add_step(&event, screenshot);
        }
    }
}
