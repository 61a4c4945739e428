use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::Page;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::config::ExecutablePaths;
use crate::models::{BrowserKind, BrowserSettings};

use super::host::ScriptHost;

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages browser lifecycle and the recorded page
pub struct BrowserManager {
    browser: Arc<Mutex<Option<Browser>>>,
    page: Arc<Mutex<Option<Page>>>,
    /// Lock to prevent concurrent browser launches
    launch_lock: Mutex<()>,
    executables: ExecutablePaths,
}

/// Well-known install locations for a browser on this platform
fn known_locations(kind: BrowserKind) -> Vec<&'static str> {
    match kind {
        BrowserKind::Chrome => {
            if cfg!(target_os = "windows") {
                vec![
                    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
                ]
            } else if cfg!(target_os = "macos") {
                vec!["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"]
            } else {
                vec![
                    "/usr/bin/google-chrome",
                    "/usr/bin/google-chrome-stable",
                    "/usr/bin/chromium",
                    "/usr/bin/chromium-browser",
                    "/snap/bin/chromium",
                ]
            }
        }
        BrowserKind::Edge => {
            if cfg!(target_os = "windows") {
                vec![
                    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
                    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
                ]
            } else if cfg!(target_os = "macos") {
                vec!["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"]
            } else {
                vec![
                    "/usr/bin/microsoft-edge",
                    "/usr/bin/microsoft-edge-stable",
                    "/opt/microsoft/msedge/msedge",
                ]
            }
        }
    }
}

/// Resolve the executable for a browser: explicit path first, then known locations.
/// `None` for Chrome lets chromiumoxide run its own detection.
pub fn find_executable(kind: BrowserKind, explicit: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.clone());
    }
    known_locations(kind)
        .into_iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// Command-line switches for a recording window
pub fn launch_args(settings: &BrowserSettings) -> Vec<String> {
    vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-default-apps".to_string(),
        format!("--window-position={},{}", settings.window_x, settings.window_y),
    ]
}

impl BrowserManager {
    pub fn new(executables: ExecutablePaths) -> Self {
        Self {
            browser: Arc::new(Mutex::new(None)),
            page: Arc::new(Mutex::new(None)),
            launch_lock: Mutex::new(()),
            executables,
        }
    }

    /// Launch the configured browser, falling back once to the alternate one.
    /// Returns the browser that actually started.
    pub async fn launch(&self, url: &str, settings: &BrowserSettings) -> Result<BrowserKind> {
        let _launch_guard = self.launch_lock.lock().await;

        // Close any existing browser first
        self.close().await.ok();

        let preferred = settings.browser;
        let first_error = match self.launch_kind(preferred, url, settings).await {
            Ok(()) => return Ok(preferred),
            Err(e) => e,
        };

        let fallback = preferred.alternate();
        tracing::warn!(
            "Failed to launch {}: {}. Trying {} instead",
            preferred.as_str(),
            first_error,
            fallback.as_str()
        );

        match self.launch_kind(fallback, url, settings).await {
            Ok(()) => Ok(fallback),
            Err(second_error) => Err(anyhow!(
                "Could not launch a browser. {}: {}; {}: {}",
                preferred.as_str(),
                first_error,
                fallback.as_str(),
                second_error
            )),
        }
    }

    async fn launch_kind(&self, kind: BrowserKind, url: &str, settings: &BrowserSettings) -> Result<()> {
        let executable = find_executable(kind, self.executables.for_kind(kind));
        if kind == BrowserKind::Edge && executable.is_none() {
            return Err(anyhow!("Microsoft Edge is not installed"));
        }

        let mut config = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height);

        if let Some(path) = executable {
            tracing::debug!("Using {} executable at {:?}", kind.as_str(), path);
            config = config.chrome_executable(path);
        }

        if !settings.headless {
            config = config.with_head();
        }

        // Do NOT use --incognito; it opens a second window. Incognito uses a CDP context below.
        for arg in launch_args(settings) {
            config = config.arg(arg);
        }

        let config = config
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {}", e))?;

        let (mut browser, mut handler) = timeout(LAUNCH_TIMEOUT, Browser::launch(config))
            .await
            .map_err(|_| anyhow!("Browser launch timeout ({}s)", LAUNCH_TIMEOUT.as_secs()))?
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                tracing::trace!("Browser event: {:?}", event);
            }
        });

        let default_pages = browser
            .pages()
            .await
            .map_err(|e| anyhow!("Failed to get pages: {}", e))?;

        if settings.incognito {
            tracing::info!("Creating incognito browser context via CDP");
            browser
                .start_incognito_context()
                .await
                .map_err(|e| anyhow!("Failed to start incognito context: {}", e))?;
        }

        let page = browser
            .new_page(url)
            .await
            .map_err(|e| anyhow!("Failed to open {}: {}", url, e))?;

        // Close the default tabs only once the recorded page exists
        for default_page in default_pages {
            if let Err(e) = default_page.close().await {
                tracing::warn!("Failed to close default page: {}", e);
            }
        }

        *self.browser.lock().await = Some(browser);
        *self.page.lock().await = Some(page);

        tracing::info!(
            "{} launched{} and navigated to {}",
            kind.as_str(),
            if settings.incognito { " (incognito context)" } else { "" },
            url
        );
        Ok(())
    }

    async fn current_page(&self) -> Result<Page> {
        self.page
            .lock()
            .await
            .clone()
            .ok_or_else(|| anyhow!("No page available"))
    }

    /// Close the browser
    pub async fn close(&self) -> Result<()> {
        let mut page_guard = self.page.lock().await;
        let mut browser_guard = self.browser.lock().await;

        if let Some(page) = page_guard.take() {
            let _ = page.close().await;
        }

        if let Some(mut browser) = browser_guard.take() {
            let _ = browser.close().await;
            tracing::info!("Browser closed");
        }

        Ok(())
    }
}

#[async_trait]
impl ScriptHost for BrowserManager {
    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.current_page().await?;
        page.goto(url)
            .await
            .map_err(|e| anyhow!("Failed to navigate to {}: {}", url, e))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let page = self.current_page().await?;
        let result = page
            .evaluate(script)
            .await
            .map_err(|e| anyhow!("Failed to evaluate script: {}", e))?;

        result
            .into_value()
            .map_err(|e| anyhow!("Failed to parse script result: {}", e))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let page = self.current_page().await?;
        page.screenshot(
            chromiumoxide::page::ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build(),
        )
        .await
        .map_err(|e| anyhow!("Failed to take screenshot: {}", e))
    }

    async fn install_script(&self, script: &str) -> Result<()> {
        let page = self.current_page().await?;

        // Survives navigations: every new document in the tab gets the script
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
            .await
            .map_err(|e| anyhow!("Failed to register script on new documents: {}", e))?;

        self.evaluate(script).await?;
        Ok(())
    }
}

impl Default for BrowserManager {
    fn default() -> Self {
        Self::new(ExecutablePaths::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_executable_wins() {
        let explicit = PathBuf::from("/custom/msedge");
        assert_eq!(
            find_executable(BrowserKind::Edge, Some(&explicit)),
            Some(explicit)
        );
    }

    #[test]
    fn test_launch_args_include_window_position() {
        let settings = BrowserSettings {
            window_x: 1920,
            window_y: 40,
            ..Default::default()
        };
        let args = launch_args(&settings);
        assert!(args.contains(&"--window-position=1920,40".to_string()));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
    }
}
