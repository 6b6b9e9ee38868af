use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{BrowserError, PageSession};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const HIDE_WEBDRIVER: &str = "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Attach to an already running Chrome instead of launching one.
    pub remote_debugging_url: Option<String>,
    pub request_timeout: Duration,
}

/// Whether the browser process belongs to this session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ownership {
    Launched,
    /// Someone else's Chrome; only our tab may be closed.
    Attached,
}

impl Ownership {
    fn of(opts: &LaunchOptions) -> Self {
        if opts.remote_debugging_url.is_some() { Ownership::Attached } else { Ownership::Launched }
    }
}

/// One Chrome tab plus the CDP event pump that keeps it alive.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    ownership: Ownership,
}

impl ChromeSession {
    pub async fn launch(opts: &LaunchOptions) -> Result<Self, BrowserError> {
        let (mut browser, mut handler) = match &opts.remote_debugging_url {
            Some(url) => {
                info!(url = %url, "connecting to remote Chrome");
                Browser::connect(url.as_str()).await?
            }
            None => {
                let mut builder = BrowserConfig::builder()
                    .no_sandbox()
                    .window_size(1920, 1080)
                    .request_timeout(opts.request_timeout)
                    .arg("--disable-dev-shm-usage")
                    .arg("--disable-gpu")
                    .arg("--disable-blink-features=AutomationControlled")
                    .arg("--window-size=1920,1080");
                if !opts.headless {
                    builder = builder.with_head();
                }
                let config = builder.build().map_err(BrowserError::Launch)?;
                Browser::launch(config).await?
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let ownership = Ownership::of(opts);
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                if ownership == Ownership::Launched {
                    let _ = browser.close().await;
                }
                handler.abort();
                return Err(err.into());
            }
        };
        if let Err(err) = page.set_user_agent(USER_AGENT).await {
            let session = Self { browser, page, handler, ownership };
            let _ = session.close().await;
            return Err(err.into());
        }

        Ok(Self { browser, page, handler, ownership })
    }

    /// Closes the tab, and the browser too when this session launched it.
    pub async fn close(self) -> Result<(), BrowserError> {
        let Self { mut browser, page, handler, ownership } = self;
        let closed = match ownership {
            Ownership::Attached => page.close().await,
            Ownership::Launched => match browser.close().await {
                Ok(_) => {
                    let _ = browser.wait().await;
                    Ok(())
                }
                Err(err) => Err(err),
            },
        };
        handler.abort();
        closed.map_err(BrowserError::from)
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page.goto(url).await?;
        // masked per document, so re-apply after every navigation
        if let Err(err) = self.page.evaluate(HIDE_WEBDRIVER).await {
            debug!(error = %err, "webdriver mask failed");
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>, BrowserError> {
        Ok(self.page.url().await?)
    }

    async fn html(&self) -> Result<String, BrowserError> {
        Ok(self.page.content().await?)
    }

    async fn scroll_height(&self) -> Result<i64, BrowserError> {
        let res = self.page.evaluate("document.body.scrollHeight").await?;
        res.into_value::<i64>().map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        self.page.evaluate("window.scrollTo(0, document.body.scrollHeight);").await?;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(!self.page.find_elements(selector).await?.is_empty())
    }

    async fn click(&self, selector: &str) -> Result<bool, BrowserError> {
        let Ok(el) = self.page.find_element(selector).await else { return Ok(false) };
        Ok(el.click().await.is_ok())
    }

    async fn click_button_labelled(&self, labels: &[&str]) -> Result<Option<String>, BrowserError> {
        let wanted = serde_json::to_string(labels).map_err(|e| BrowserError::Script(e.to_string()))?;
        let script = format!(
            r#"(() => {{
                const wanted = {wanted};
                for (const b of document.querySelectorAll('button')) {{
                    const t = (b.innerText || '').trim();
                    if (wanted.includes(t) && b.offsetParent !== null) {{ b.click(); return t; }}
                }}
                return '';
            }})()"#
        );
        let res = self.page.evaluate(script).await?;
        let clicked = res.into_value::<String>().map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(non_empty(clicked))
    }

    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page.save_screenshot(params, path).await?;
        Ok(())
    }
}

fn non_empty(label: String) -> Option<String> {
    if label.is_empty() { None } else { Some(label) }
}
