use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::browser::LaunchOptions;

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const DEFAULT_MAX_ITEMS: usize = 7;
const DEFAULT_POST_SCROLLS: usize = 6;
const DEFAULT_COMMENT_SCROLLS: usize = 8;
const DEFAULT_READY_TIMEOUT_SECS: u64 = 20;
const DEFAULT_SCROLL_PAUSE_MS: u64 = 3000;

/// Knobs for one scrape run. Defaults mirror the pacing Reddit tolerates.
#[derive(Clone, Debug, Serialize)]
pub struct ScrapeSettings {
    pub base_url: String,
    pub headless: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_debugging_url: Option<String>,
    /// Per-page cap on processed elements.
    pub max_items: usize,
    pub post_scrolls: usize,
    pub comment_scrolls: usize,
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
    pub scroll_pause: Duration,
    pub post_settle: Duration,
    pub comment_settle: Duration,
    pub popup_pause: Duration,
    pub between_pages: Duration,
    pub request_timeout: Duration,
    /// Screenshots of pages that never became ready land here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics_dir: Option<PathBuf>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: false,
            remote_debugging_url: None,
            max_items: DEFAULT_MAX_ITEMS,
            post_scrolls: DEFAULT_POST_SCROLLS,
            comment_scrolls: DEFAULT_COMMENT_SCROLLS,
            ready_timeout: Duration::from_secs(DEFAULT_READY_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(500),
            scroll_pause: Duration::from_millis(DEFAULT_SCROLL_PAUSE_MS),
            post_settle: Duration::from_secs(3),
            comment_settle: Duration::from_secs(5),
            popup_pause: Duration::from_secs(1),
            between_pages: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            diagnostics_dir: None,
        }
    }
}

impl ScrapeSettings {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(base) = std::env::var("PERSONA_BASE_URL") {
            cfg.base_url = base;
        }
        if let Ok(v) = std::env::var("PERSONA_HEADLESS") {
            cfg.headless = truthy(&v);
        }
        if let Ok(url) = std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL") {
            if !url.trim().is_empty() {
                cfg.remote_debugging_url = Some(url);
            }
        }
        if let Some(n) = env_parse::<usize>("PERSONA_MAX_ITEMS") {
            cfg.max_items = n;
        }
        if let Some(secs) = env_parse::<u64>("PERSONA_READY_TIMEOUT_SECS") {
            cfg.ready_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>("PERSONA_SCROLL_PAUSE_MS") {
            cfg.scroll_pause = Duration::from_millis(ms);
        }
        if let Ok(dir) = std::env::var("PERSONA_DIAGNOSTICS_DIR") {
            cfg.diagnostics_dir = Some(PathBuf::from(dir));
        }
        cfg
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
            remote_debugging_url: self.remote_debugging_url.clone(),
            request_timeout: self.request_timeout,
        }
    }

    /// All sleeps zeroed; handy for scripted sessions.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            ready_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            scroll_pause: Duration::ZERO,
            post_settle: Duration::ZERO,
            comment_settle: Duration::ZERO,
            popup_pause: Duration::ZERO,
            between_pages: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

pub fn truthy(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
