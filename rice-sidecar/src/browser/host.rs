use anyhow::Result;
use async_trait::async_trait;

/// The capabilities recording needs from an automated browser tab.
///
/// Scripts return JSON-serializable values; the driver behind this is opaque.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// PNG bytes of the visible page
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Run `script` now and on every document loaded later in this tab
    async fn install_script(&self, script: &str) -> Result<()> {
        self.evaluate(script).await.map(|_| ())
    }
}
