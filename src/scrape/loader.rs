use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::sleep;
use tracing::debug;

use crate::browser::{BrowserError, PageSession};
use crate::config::ScrapeSettings;
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::scrape::{Phase, Scrape};
use crate::util::text::preview;

const CLOSE_SELECTORS: &[&str] = &[
    "button[aria-label='Close']",
    "button[data-testid='close-button']",
    ".icon-close",
    "[data-testid='cookie-banner'] button",
];

const ACCEPT_LABELS: &[&str] = &["Continue", "Accept"];

/// One listing page to bring into a scrapeable state.
#[derive(Clone, Debug)]
pub struct PageLoad<'a> {
    pub url: &'a str,
    pub ready: &'static [&'static str],
    pub settle: Duration,
    pub scroll_budget: usize,
    /// Page-source characters logged when the page never becomes ready.
    pub snippet_chars: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollStop {
    /// Height unchanged after a scroll; nothing more to lazy-load.
    Stable,
    Budget,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScrollReport {
    pub scrolls: usize,
    pub stop: ScrollStop,
    pub final_height: i64,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Ready {
        html: String,
        ready_selector: &'static str,
        scroll: ScrollReport,
    },
    NotReady {
        url: Option<String>,
        snippet: String,
    },
}

/// Best-effort clicks on known close/accept controls. Returns how many fired.
pub async fn dismiss_popups(session: &dyn PageSession, pause: Duration) -> usize {
    let mut clicked = 0;
    for selector in CLOSE_SELECTORS {
        match session.click(selector).await {
            Ok(true) => {
                debug!(selector, "dismissed popup");
                clicked += 1;
                sleep(pause).await;
            }
            Ok(false) => {}
            Err(err) => debug!(selector, error = %err, "popup click failed"),
        }
    }
    match session.click_button_labelled(ACCEPT_LABELS).await {
        Ok(Some(label)) => {
            debug!(label = %label, "dismissed popup");
            clicked += 1;
            sleep(pause).await;
        }
        Ok(None) => {}
        Err(err) => debug!(error = %err, "labelled button click failed"),
    }
    clicked
}

/// Poll until any of `selectors` is present or `timeout` elapses.
/// Always checks at least once.
pub async fn wait_for_any(
    session: &dyn PageSession,
    selectors: &[&'static str],
    timeout: Duration,
    poll: Duration,
) -> Result<Option<&'static str>, BrowserError> {
    let deadline = Instant::now() + timeout;
    loop {
        for selector in selectors {
            if session.exists(selector).await? {
                return Ok(Some(*selector));
            }
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(poll).await;
    }
}

/// Scroll to the bottom up to `budget` times, stopping as soon as the
/// document height stops growing.
pub async fn scroll_until_stable(
    session: &dyn PageSession,
    budget: usize,
    pause: Duration,
) -> Result<ScrollReport, BrowserError> {
    let mut height = session.scroll_height().await?;
    for i in 0..budget {
        session.scroll_to_bottom().await?;
        sleep(pause).await;
        let next = session.scroll_height().await?;
        debug!(scroll = i + 1, before = height, after = next, "scrolled");
        if next == height {
            return Ok(ScrollReport { scrolls: i + 1, stop: ScrollStop::Stable, final_height: next });
        }
        height = next;
    }
    Ok(ScrollReport { scrolls: budget, stop: ScrollStop::Budget, final_height: height })
}

/// Navigate, settle, dismiss popups, wait for content, paginate, snapshot.
pub async fn load_page(
    session: &dyn PageSession,
    page: &PageLoad<'_>,
    settings: &ScrapeSettings,
    log: &LogCtx<Scrape>,
) -> Result<LoadOutcome, BrowserError> {
    let _s = log.span_kv(&Phase::Navigate, [("url", page.url.to_string())]).entered();
    session.goto(page.url).await?;
    sleep(page.settle).await;
    drop(_s);

    let _s = log.span(&Phase::Dismiss).entered();
    let dismissed = dismiss_popups(session, settings.popup_pause).await;
    if dismissed > 0 {
        log.debug(format!("dismissed {} popup(s)", dismissed));
    }
    drop(_s);

    let _s = log.span(&Phase::WaitReady).entered();
    let ready = wait_for_any(session, page.ready, settings.ready_timeout, settings.poll_interval).await?;
    drop(_s);

    let Some(ready_selector) = ready else {
        let url = session.current_url().await.ok().flatten();
        let snippet = match session.html().await {
            Ok(html) => preview(&html, page.snippet_chars),
            Err(err) => format!("<page source unavailable: {err}>"),
        };
        log.warn_kv("page never became ready", [
            ("url", url.clone().unwrap_or_else(|| page.url.to_string())),
            ("timeout_secs", settings.ready_timeout.as_secs().to_string()),
        ]);
        log.warn(format!("Page source snippet: {}", snippet));
        if let Some(dir) = &settings.diagnostics_dir {
            save_screenshot(session, dir, page.url, log).await;
        }
        return Ok(LoadOutcome::NotReady { url, snippet });
    };
    log.debug(format!("page ready via {}", ready_selector));

    let _s = log.span(&Phase::Scroll).entered();
    let scroll = scroll_until_stable(session, page.scroll_budget, settings.scroll_pause).await?;
    log.debug_kv("scroll finished", [
        ("scrolls", scroll.scrolls.to_string()),
        ("stop", format!("{:?}", scroll.stop)),
        ("height", scroll.final_height.to_string()),
    ]);
    drop(_s);

    let html = session.html().await?;
    Ok(LoadOutcome::Ready { html, ready_selector, scroll })
}

async fn save_screenshot(session: &dyn PageSession, dir: &std::path::Path, url: &str, log: &LogCtx<Scrape>) {
    let name: String = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("page")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    let path: PathBuf = dir.join(format!("not_ready_{}.png", if name.is_empty() { "page" } else { &name }));
    if let Err(err) = std::fs::create_dir_all(dir) {
        log.warn(format!("cannot create diagnostics dir {}: {}", dir.display(), err));
        return;
    }
    match session.screenshot(&path).await {
        Ok(()) => log.info(format!("📸 saved screenshot to {}", path.display())),
        Err(err) => log.warn(format!("screenshot failed: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockSession;
    use crate::telemetry;

    const READY: &[&str] = &["shreddit-post", "[data-testid='post-container']"];

    fn page(url: &str, budget: usize) -> PageLoad<'_> {
        PageLoad { url, ready: READY, settle: Duration::ZERO, scroll_budget: budget, snippet_chars: 20 }
    }

    #[tokio::test]
    async fn scroll_stops_when_height_is_stable() {
        let session = MockSession::new().with_heights(&[1000, 2000, 2000]);
        let report = scroll_until_stable(&session, 8, Duration::ZERO).await.unwrap();
        assert_eq!(report, ScrollReport { scrolls: 2, stop: ScrollStop::Stable, final_height: 2000 });
        assert_eq!(session.scrolls(), 2);
    }

    #[tokio::test]
    async fn scroll_respects_budget() {
        let session = MockSession::new().with_heights(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let report = scroll_until_stable(&session, 3, Duration::ZERO).await.unwrap();
        assert_eq!(report.stop, ScrollStop::Budget);
        assert_eq!(report.scrolls, 3);
        assert_eq!(report.final_height, 4);
        assert_eq!(session.scrolls(), 3);
    }

    #[tokio::test]
    async fn zero_budget_never_scrolls() {
        let session = MockSession::new().with_heights(&[10]);
        let report = scroll_until_stable(&session, 0, Duration::ZERO).await.unwrap();
        assert_eq!(report.scrolls, 0);
        assert_eq!(session.scrolls(), 0);
    }

    #[tokio::test]
    async fn wait_returns_first_present_selector() {
        let url = "https://r.example/user/a/submitted/";
        let session = MockSession::new().with_page(url, "<div data-testid='post-container'>x</div>");
        session.goto(url).await.unwrap();
        let hit = wait_for_any(&session, READY, Duration::ZERO, Duration::ZERO).await.unwrap();
        assert_eq!(hit, Some("[data-testid='post-container']"));
    }

    #[tokio::test]
    async fn popups_are_clicked_best_effort() {
        let url = "https://r.example/";
        let html = "<button aria-label='Close'>x</button><button>Accept</button><button>Later</button>";
        let session = MockSession::new().with_page(url, html);
        session.goto(url).await.unwrap();
        assert_eq!(dismiss_popups(&session, Duration::ZERO).await, 2);
        assert_eq!(session.clicks(), vec!["button[aria-label='Close']".to_string(), "Accept".to_string()]);
    }

    #[tokio::test]
    async fn not_ready_page_reports_snippet() {
        let url = "https://r.example/user/a/submitted/";
        let session = MockSession::new().with_page(url, "<html><body><p>blocked by interstitial</p></body></html>");
        let out = load_page(&session, &page(url, 6), &ScrapeSettings::instant(), &telemetry::scrape()).await.unwrap();
        match out {
            LoadOutcome::NotReady { url: seen, snippet } => {
                assert_eq!(seen.as_deref(), Some(url));
                assert_eq!(snippet.chars().count(), 20);
            }
            other => panic!("expected NotReady, got {other:?}"),
        }
        assert_eq!(session.scrolls(), 0);
    }

    #[tokio::test]
    async fn ready_page_is_scrolled_and_captured() {
        let url = "https://r.example/user/a/submitted/";
        let session = MockSession::new()
            .with_page(url, "<shreddit-post post-title='t'></shreddit-post>")
            .with_heights(&[500, 900, 900]);
        let out = load_page(&session, &page(url, 6), &ScrapeSettings::instant(), &telemetry::scrape()).await.unwrap();
        let LoadOutcome::Ready { html, ready_selector, scroll } = out else { panic!("expected Ready") };
        assert_eq!(ready_selector, "shreddit-post");
        assert_eq!(scroll.stop, ScrollStop::Stable);
        assert!(html.contains("shreddit-post"));
        assert_eq!(session.visits(), vec![url.to_string()]);
    }
}
