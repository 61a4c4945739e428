use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{BrowserKind, BrowserSettings};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub db_path: PathBuf,
    pub recording: RecordingConfig,
    /// Defaults used until browser settings are stored in the database
    pub browser: BrowserSettings,
    pub executables: ExecutablePaths,
}

/// Poller tuning
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    pub poll_interval: Duration,
    /// Delay before the next cycle after a failed one
    pub poll_backoff: Duration,
    pub capture_screenshots: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(800),
            poll_backoff: Duration::from_millis(1000),
            capture_screenshots: false,
        }
    }
}

/// Explicit browser binaries, overriding discovery
#[derive(Debug, Clone, Default)]
pub struct ExecutablePaths {
    pub chrome: Option<PathBuf>,
    pub edge: Option<PathBuf>,
}

impl ExecutablePaths {
    pub fn for_kind(&self, kind: BrowserKind) -> Option<&PathBuf> {
        match kind {
            BrowserKind::Chrome => self.chrome.as_ref(),
            BrowserKind::Edge => self.edge.as_ref(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Default database location inside the platform data directory
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("com.rice.tester")
        .join("rice_tester.db")
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let recording = RecordingConfig {
            poll_interval: env_parse::<u64>("RICE_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.recording.poll_interval),
            poll_backoff: env_parse::<u64>("RICE_POLL_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.recording.poll_backoff),
            capture_screenshots: env_flag("RICE_CAPTURE_SCREENSHOTS")
                .unwrap_or(defaults.recording.capture_screenshots),
        };

        let browser = BrowserSettings {
            browser: env_parse::<BrowserKind>("RICE_BROWSER").unwrap_or(defaults.browser.browser),
            incognito: env_flag("RICE_INCOGNITO").unwrap_or(defaults.browser.incognito),
            headless: env_flag("RICE_HEADLESS").unwrap_or(defaults.browser.headless),
            window_x: env_parse("RICE_WINDOW_X").unwrap_or(defaults.browser.window_x),
            window_y: env_parse("RICE_WINDOW_Y").unwrap_or(defaults.browser.window_y),
            window_width: env_parse("RICE_WINDOW_WIDTH").unwrap_or(defaults.browser.window_width),
            window_height: env_parse("RICE_WINDOW_HEIGHT")
                .unwrap_or(defaults.browser.window_height),
        };

        Self {
            port: env_parse("RICE_PORT").unwrap_or(defaults.port),
            host: env::var("RICE_HOST").unwrap_or(defaults.host),
            db_path: env::var("RICE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            recording,
            browser,
            executables: ExecutablePaths {
                chrome: env::var("CHROME_PATH").ok().map(PathBuf::from),
                edge: env::var("EDGE_PATH").ok().map(PathBuf::from),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8766,
            host: "127.0.0.1".to_string(),
            db_path: default_db_path(),
            recording: RecordingConfig::default(),
            browser: BrowserSettings::default(),
            executables: ExecutablePaths::default(),
        }
    }
}
