use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported Chromium-based browsers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Edge,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Edge => "edge",
        }
    }

    /// The browser tried when this one fails to launch
    pub fn alternate(&self) -> Self {
        match self {
            BrowserKind::Chrome => BrowserKind::Edge,
            BrowserKind::Edge => BrowserKind::Chrome,
        }
    }
}

impl FromStr for BrowserKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chrome" | "chromium" | "google-chrome" => Ok(BrowserKind::Chrome),
            "edge" | "msedge" | "microsoft-edge" => Ok(BrowserKind::Edge),
            _ => Err(()),
        }
    }
}

/// Browser configuration applied when a recording launches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default)]
    pub browser: BrowserKind,
    #[serde(default)]
    pub incognito: bool,
    #[serde(default)]
    pub headless: bool,
    #[serde(default)]
    pub window_x: i32,
    #[serde(default)]
    pub window_y: i32,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            incognito: false,
            headless: false,
            window_x: 0,
            window_y: 0,
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

/// Per-request overrides on top of the stored settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowserOverrides {
    pub browser: Option<BrowserKind>,
    pub incognito: Option<bool>,
    pub headless: Option<bool>,
}

impl BrowserSettings {
    pub fn with_overrides(mut self, overrides: &BrowserOverrides) -> Self {
        if let Some(browser) = overrides.browser {
            self.browser = browser;
        }
        if let Some(incognito) = overrides.incognito {
            self.incognito = incognito;
        }
        if let Some(headless) = overrides.headless {
            self.headless = headless;
        }
        self
    }
}
