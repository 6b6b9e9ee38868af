use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub mod chrome;
#[cfg(test)]
pub mod mock;

pub use chrome::{ChromeSession, LaunchOptions};

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("cdp error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("unexpected script result: {0}")]
    Script(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The slice of a browser tab the scraper drives.
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;
    async fn current_url(&self) -> Result<Option<String>, BrowserError>;
    /// Serialized DOM of the current page.
    async fn html(&self) -> Result<String, BrowserError>;
    async fn scroll_height(&self) -> Result<i64, BrowserError>;
    async fn scroll_to_bottom(&self) -> Result<(), BrowserError>;
    async fn exists(&self, selector: &str) -> Result<bool, BrowserError>;
    /// Click the first element matching `selector`; false if absent or not clickable.
    async fn click(&self, selector: &str) -> Result<bool, BrowserError>;
    /// Click the first `<button>` whose visible text equals one of `labels`.
    async fn click_button_labelled(&self, labels: &[&str]) -> Result<Option<String>, BrowserError>;
    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError>;
}
