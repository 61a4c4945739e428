pub mod host;
pub mod manager;

pub use host::ScriptHost;
pub use manager::BrowserManager;
