use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::browser::{BrowserManager, ScriptHost};
use crate::config::{ExecutablePaths, RecordingConfig};
use crate::error::AppError;
use crate::models::{
    BrowserKind, BrowserSettings, RecordedStep, RecordingMetrics, RecordingSession, SaveRecording,
    SessionStatus, TestStepGroup,
};
use crate::store::StepRepository;

use super::poller::Poller;
use super::script::{set_active_script, RECORDER_SCRIPT};
use super::step_recorder::StepRecorder;

/// Check a start URL before any browser is launched. Web pages and local files can be recorded.
pub fn validate_start_url(raw: &str) -> crate::error::Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::ValidationError("A start URL is required".to_string()));
    }
    let url = Url::parse(raw)
        .map_err(|e| AppError::ValidationError(format!("Invalid start URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" | "file" => Ok(url),
        other => Err(AppError::ValidationError(format!(
            "Unsupported URL scheme '{}'",
            other
        ))),
    }
}

/// One recording session: the browser, its poller and the captured steps
pub struct BrowserRecorder {
    /// The browser manager - public for integration tests
    pub browser: Arc<BrowserManager>,
    host: Mutex<Option<Arc<dyn ScriptHost>>>,
    session: Mutex<RecordingSession>,
    steps: Arc<Mutex<StepRecorder>>,
    capturing: Arc<AtomicBool>,
    config: RecordingConfig,
    cancel: CancellationToken,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl BrowserRecorder {
    pub fn new(session_id: String, start_url: &Url, config: RecordingConfig, executables: ExecutablePaths) -> Self {
        Self {
            browser: Arc::new(BrowserManager::new(executables)),
            host: Mutex::new(None),
            session: Mutex::new(RecordingSession::new(session_id, start_url.to_string())),
            steps: Arc::new(Mutex::new(StepRecorder::new())),
            capturing: Arc::new(AtomicBool::new(false)),
            config,
            cancel: CancellationToken::new(),
            poller: Mutex::new(None),
        }
    }

    /// Launch the browser on the start URL and begin capturing.
    /// On failure the session moves to `error` and no browser is left running.
    pub async fn start(&self, settings: &BrowserSettings) -> Result<BrowserKind> {
        let start_url = self.session.lock().await.start_url.clone();

        let kind = match self.browser.launch(&start_url, settings).await {
            Ok(kind) => kind,
            Err(e) => {
                self.session.lock().await.fail(e.to_string());
                return Err(e);
            }
        };

        let host: Arc<dyn ScriptHost> = self.browser.clone();
        if let Err(e) = self.attach(host, kind).await {
            self.session.lock().await.fail(e.to_string());
            self.browser.close().await.ok();
            return Err(e);
        }

        Ok(kind)
    }

    /// Begin capturing on an already open page
    pub async fn attach(&self, host: Arc<dyn ScriptHost>, kind: BrowserKind) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(anyhow!("Recording was cancelled before capture started"));
        }
        host.install_script(RECORDER_SCRIPT).await?;
        self.capturing.store(true, Ordering::SeqCst);

        let poller = Poller::new(
            Arc::clone(&host),
            Arc::clone(&self.steps),
            Arc::clone(&self.capturing),
            self.config.clone(),
        );
        let handle = tokio::spawn(poller.run(self.cancel.clone()));

        *self.poller.lock().await = Some(handle);
        *self.host.lock().await = Some(host);

        let mut session = self.session.lock().await;
        session.start(kind);
        tracing::info!("Recording {} started in {} on {}", session.id, kind.as_str(), session.start_url);
        Ok(())
    }

    async fn set_capturing(&self, active: bool) -> Result<()> {
        self.capturing.store(active, Ordering::SeqCst);
        let host = self.host.lock().await.clone();
        if let Some(host) = host {
            host.evaluate(&set_active_script(active)).await?;
        }
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        let status = self.session.lock().await.status;
        if status != SessionStatus::Recording {
            return Err(anyhow!("Cannot pause a recording that is {}", status.as_str()));
        }
        self.set_capturing(false).await?;
        self.session.lock().await.pause();
        tracing::info!("Recording paused");
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        let status = self.session.lock().await.status;
        if status != SessionStatus::Paused {
            return Err(anyhow!("Cannot resume a recording that is {}", status.as_str()));
        }
        self.set_capturing(true).await?;
        self.session.lock().await.resume();
        tracing::info!("Recording resumed");
        Ok(())
    }

    /// Stop capturing and close the browser. Steps stay available for saving.
    pub async fn stop(&self) -> Result<usize> {
        self.shutdown_poller().await;
        self.session.lock().await.stop();

        let step_count = self.steps.lock().await.len();
        tracing::info!("Recording stopped with {} steps", step_count);

        // Close browser in background to avoid lag on stop
        let browser = Arc::clone(&self.browser);
        tokio::spawn(async move {
            if let Err(e) = browser.close().await {
                tracing::warn!("Background browser close failed: {}", e);
            }
        });

        Ok(step_count)
    }

    /// Abandon the recording: steps are discarded and the browser closed
    pub async fn cancel(&self) -> Result<()> {
        self.shutdown_poller().await;
        self.steps.lock().await.clear();
        self.session.lock().await.stop();
        self.browser.close().await?;
        tracing::info!("Recording cancelled");
        Ok(())
    }

    async fn shutdown_poller(&self) {
        self.capturing.store(false, Ordering::SeqCst);
        self.cancel.cancel();

        let handle = self.poller.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("Poller task ended abnormally: {}", e);
            }
        }
    }

    pub async fn clear(&self) {
        self.steps.lock().await.clear();
        tracing::info!("Recorded steps cleared");
    }

    /// Persist the current steps as a named group. Steps are cleared only on success.
    pub async fn save(
        &self,
        repository: &StepRepository,
        request: &SaveRecording,
    ) -> crate::error::Result<(TestStepGroup, usize)> {
        let mut steps = self.steps.lock().await;
        if steps.is_empty() {
            return Err(AppError::ValidationError("There are no recorded steps to save".to_string()));
        }

        let group = repository.save_recording(request, steps.steps())?;
        let saved = steps.len();
        steps.clear();
        Ok((group, saved))
    }

    pub async fn session(&self) -> RecordingSession {
        self.session.lock().await.clone()
    }

    pub async fn steps(&self) -> Vec<RecordedStep> {
        self.steps.lock().await.steps().to_vec()
    }

    pub async fn metrics(&self) -> RecordingMetrics {
        self.steps.lock().await.metrics()
    }

    /// Subscribe to steps as they are recorded
    pub async fn subscribe_steps(&self) -> broadcast::Receiver<RecordedStep> {
        self.steps.lock().await.subscribe()
    }
}
