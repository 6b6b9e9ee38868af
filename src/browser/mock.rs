use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::{BrowserError, PageSession};

/// Scripted tab: fixed HTML per URL, a queue of scroll heights.
#[derive(Default)]
pub struct MockSession {
    pages: HashMap<String, String>,
    current: Mutex<Option<String>>,
    heights: Mutex<VecDeque<i64>>,
    last_height: Mutex<i64>,
    visits: Mutex<Vec<String>>,
    scrolls: Mutex<usize>,
    clicks: Mutex<Vec<String>>,
    fail_goto: bool,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_heights(self, heights: &[i64]) -> Self {
        *self.heights.lock().unwrap() = heights.iter().copied().collect();
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_goto = true;
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn scrolls(&self) -> usize {
        *self.scrolls.lock().unwrap()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }

    fn current_html(&self) -> String {
        let cur = self.current.lock().unwrap().clone();
        cur.and_then(|u| self.pages.get(&u).cloned()).unwrap_or_else(|| "<html><body></body></html>".to_string())
    }

    fn matches(&self, selector: &str) -> bool {
        let Ok(sel) = Selector::parse(selector) else { return false };
        let doc = Html::parse_document(&self.current_html());
        doc.select(&sel).next().is_some()
    }
}

#[async_trait]
impl PageSession for MockSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.visits.lock().unwrap().push(url.to_string());
        if self.fail_goto {
            return Err(BrowserError::Script(format!("navigation to {url} failed")));
        }
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>, BrowserError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn html(&self) -> Result<String, BrowserError> {
        Ok(self.current_html())
    }

    async fn scroll_height(&self) -> Result<i64, BrowserError> {
        let mut last = self.last_height.lock().unwrap();
        if let Some(h) = self.heights.lock().unwrap().pop_front() {
            *last = h;
        }
        Ok(*last)
    }

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        *self.scrolls.lock().unwrap() += 1;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(self.matches(selector))
    }

    async fn click(&self, selector: &str) -> Result<bool, BrowserError> {
        if self.matches(selector) {
            self.clicks.lock().unwrap().push(selector.to_string());
            return Ok(true);
        }
        Ok(false)
    }

    async fn click_button_labelled(&self, labels: &[&str]) -> Result<Option<String>, BrowserError> {
        let doc = Html::parse_document(&self.current_html());
        let Ok(sel) = Selector::parse("button") else { return Ok(None) };
        for b in doc.select(&sel) {
            let text = b.text().collect::<String>().trim().to_string();
            if labels.contains(&text.as_str()) {
                self.clicks.lock().unwrap().push(text.clone());
                return Ok(Some(text));
            }
        }
        Ok(None)
    }

    async fn screenshot(&self, _path: &Path) -> Result<(), BrowserError> {
        Ok(())
    }
}
