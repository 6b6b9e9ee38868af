use chrono::Utc;
use scraper::{ElementRef, Html};
use serde::Serialize;
use tokio::time::sleep;
use url::Url;

use super::loader::{load_page, LoadOutcome, PageLoad, ScrollReport};
use crate::browser::PageSession;
use crate::config::ScrapeSettings;
use crate::extract::{self, collect};
use crate::profile::url::{username_from_url, ProfilePages, ProfileUrlError};
use crate::profile::{ItemKind, ProfileSnapshot, ScrapedItem};
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::scrape::{Phase, Scrape};
use crate::util::text::{collapse_whitespace, preview};

type Extract = fn(ElementRef<'_>, usize, Option<&Url>) -> Option<ScrapedItem>;

/// How one listing page is recognised and read.
pub struct Layout {
    pub kind: ItemKind,
    pub ready: &'static [&'static str],
    pub containers: &'static [&'static str],
    pub fallback: &'static [&'static str],
    pub snippet_chars: usize,
    pub extract: Extract,
}

pub const POSTS: Layout = Layout {
    kind: ItemKind::Post,
    ready: extract::post::READY,
    containers: extract::post::CONTAINERS,
    fallback: extract::post::FALLBACK_CONTAINERS,
    snippet_chars: 500,
    extract: extract::extract_post,
};

pub const COMMENTS: Layout = Layout {
    kind: ItemKind::Comment,
    ready: extract::comment::READY,
    containers: extract::comment::CONTAINERS,
    fallback: extract::comment::FALLBACK_CONTAINERS,
    snippet_chars: 1000,
    extract: extract::extract_comment,
};

/// What came off one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageHarvest {
    pub kind: ItemKind,
    pub url: String,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<&'static str>,
    /// Elements matched by the winning container selector, before the cap.
    pub found: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll: Option<ScrollReport>,
    /// Page-source head captured when the page never became ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip)]
    pub items: Vec<ScrapedItem>,
}

impl PageHarvest {
    fn empty(kind: ItemKind, url: &str) -> Self {
        Self {
            kind,
            url: url.to_string(),
            ready: false,
            selector: None,
            found: 0,
            skipped: 0,
            scroll: None,
            snippet: None,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub username: String,
    pub pages: Vec<PageHarvest>,
}

/// Drives one browser session across a user's submitted and comments pages.
pub struct ProfileScraper<'a> {
    session: &'a dyn PageSession,
    settings: &'a ScrapeSettings,
    log: &'a LogCtx<Scrape>,
}

impl<'a> ProfileScraper<'a> {
    pub fn new(session: &'a dyn PageSession, settings: &'a ScrapeSettings, log: &'a LogCtx<Scrape>) -> Self {
        Self { session, settings, log }
    }

    pub async fn scrape(&self, profile_url: &str) -> Result<(ProfileSnapshot, ScrapeReport), ProfileUrlError> {
        let username = username_from_url(profile_url)?;
        let pages = ProfilePages::new(&self.settings.base_url, &username);
        self.log.info(format!("🔍 Scraping profile u/{}", username));

        let mut posts = self.harvest(&pages.submitted, &POSTS).await;
        sleep(self.settings.between_pages).await;
        let mut comments = self.harvest(&pages.comments, &COMMENTS).await;

        let snapshot = ProfileSnapshot::assemble(
            username.clone(),
            profile_url,
            Utc::now(),
            std::mem::take(&mut posts.items),
            std::mem::take(&mut comments.items),
        );
        self.log.totals(&username, snapshot.total_posts, snapshot.total_comments);
        Ok((snapshot, ScrapeReport { username, pages: vec![posts, comments] }))
    }

    /// Load one page and extract up to `max_items` records. Browser failures
    /// degrade to an empty harvest.
    pub async fn harvest(&self, url: &str, layout: &Layout) -> PageHarvest {
        let (settle, scroll_budget) = match layout.kind {
            ItemKind::Post => (self.settings.post_settle, self.settings.post_scrolls),
            ItemKind::Comment => (self.settings.comment_settle, self.settings.comment_scrolls),
        };
        let page = PageLoad { url, ready: layout.ready, settle, scroll_budget, snippet_chars: layout.snippet_chars };

        let outcome = match load_page(self.session, &page, self.settings, self.log).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.log.warn_kv(&format!("failed to load {} page", layout.kind.as_str()), [
                    ("url", url.to_string()),
                    ("error", err.to_string()),
                ]);
                return PageHarvest::empty(layout.kind, url);
            }
        };

        let (html, scroll) = match outcome {
            LoadOutcome::Ready { html, scroll, .. } => (html, scroll),
            LoadOutcome::NotReady { url: landed, snippet } => {
                if let Some(landed) = landed.filter(|u| u != url) {
                    self.log.warn(format!("{} page redirected to {}", layout.kind.as_str(), landed));
                }
                let mut empty = PageHarvest::empty(layout.kind, url);
                empty.snippet = Some(snippet);
                return empty;
            }
        };

        let mut harvest = extract_page(&html, layout, url, self.settings.max_items, self.log);
        harvest.scroll = Some(scroll);
        self.log.page_summary(layout.kind.as_str(), url, harvest.found, harvest.items.len(), harvest.skipped);
        harvest
    }
}

/// Collect containers from a captured page and run the extractor over the
/// first `cap` of them.
pub fn extract_page(html: &str, layout: &Layout, url: &str, cap: usize, log: &LogCtx<Scrape>) -> PageHarvest {
    let _s = log.span(&Phase::Collect).entered();
    let doc = Html::parse_document(html);
    let found = collect(&doc, layout.containers, layout.fallback);
    match found.selector {
        Some(sel) => log.info(format!("Found {} {} element(s) via {}", found.elements.len(), layout.kind.as_str(), sel)),
        None => log.warn(format!("No {} elements matched any selector", layout.kind.as_str())),
    }
    drop(_s);

    let _s = log.span(&Phase::Extract).entered();
    let base = Url::parse(url).ok();
    let mut items = Vec::new();
    let mut skipped = 0;
    for (i, el) in found.elements.iter().take(cap).enumerate() {
        let kept = (layout.extract)(*el, i, base.as_ref()).filter(|item| layout.kind.primary(item).is_some());
        match kept {
            Some(item) => {
                let primary = layout.kind.primary(&item).unwrap_or_default();
                log.debug(format!("✓ Extracted {} {}: {}", layout.kind.as_str(), i + 1, preview(&collapse_whitespace(primary), 60)));
                items.push(item);
            }
            None => {
                skipped += 1;
                log.warn(format!("skipped {} {}: no {}", layout.kind.as_str(), i + 1, primary_name(layout.kind)));
            }
        }
    }

    PageHarvest {
        kind: layout.kind,
        url: url.to_string(),
        ready: true,
        selector: found.selector,
        found: found.elements.len(),
        skipped,
        scroll: None,
        snippet: None,
        items,
    }
}

fn primary_name(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Post => "title",
        ItemKind::Comment => "body",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockSession;
    use crate::telemetry;

    const SUBMITTED: &str = "https://www.reddit.com/user/alice/submitted/";
    const COMMENTS_URL: &str = "https://www.reddit.com/user/alice/comments/";

    fn posts_page(n: usize) -> String {
        let mut html = String::from("<html><body>");
        for i in 0..n {
            html.push_str(&format!(
                r#"<shreddit-post permalink="/r/rust/comments/{i}/p/" subreddit-prefixed-name="r/rust"><a slot="title" href="/r/rust/comments/{i}/p/">Post number {i}</a></shreddit-post>"#
            ));
        }
        html.push_str("<shreddit-post><div slot='text-body'>untitled</div></shreddit-post></body></html>");
        html
    }

    const COMMENTS_PAGE: &str = r#"<html><body>
        <shreddit-profile-comment><div slot="comment"><p>A thoughtful reply about lifetimes.</p></div></shreddit-profile-comment>
        <shreddit-profile-comment><div slot="comment"><p>short</p></div></shreddit-profile-comment>
    </body></html>"#;

    #[tokio::test]
    async fn unreachable_content_yields_empty_snapshot() {
        let session = MockSession::new();
        let settings = ScrapeSettings::instant();
        let log = telemetry::scrape();
        let scraper = ProfileScraper::new(&session, &settings, &log);

        let (snap, report) = scraper.scrape("https://www.reddit.com/user/alice/").await.unwrap();
        assert_eq!(snap.username, "alice");
        assert!(snap.posts.is_empty());
        assert!(snap.comments.is_empty());
        assert_eq!((snap.total_posts, snap.total_comments), (0, 0));
        assert_eq!(session.visits(), vec![SUBMITTED.to_string(), COMMENTS_URL.to_string()]);
        assert!(report.pages.iter().all(|p| !p.ready && p.snippet.is_some()));
    }

    #[tokio::test]
    async fn navigation_failure_degrades_to_empty() {
        let session = MockSession::new().failing_navigation();
        let settings = ScrapeSettings::instant();
        let log = telemetry::scrape();
        let (snap, _) = ProfileScraper::new(&session, &settings, &log)
            .scrape("https://www.reddit.com/u/alice")
            .await
            .unwrap();
        assert_eq!(snap.total_posts + snap.total_comments, 0);
        assert_eq!(session.visits().len(), 2);
    }

    #[tokio::test]
    async fn invalid_url_fails_before_navigation() {
        let session = MockSession::new();
        let settings = ScrapeSettings::instant();
        let log = telemetry::scrape();
        let err = ProfileScraper::new(&session, &settings, &log)
            .scrape("https://example.com/alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileUrlError::Invalid(_)));
        assert!(session.visits().is_empty());
    }

    #[tokio::test]
    async fn caps_items_per_page_and_drops_records_without_primary_field() {
        let posts = posts_page(9);
        let session = MockSession::new()
            .with_page(SUBMITTED, &posts)
            .with_page(COMMENTS_URL, COMMENTS_PAGE)
            .with_heights(&[100, 100]);
        let settings = ScrapeSettings::instant();
        let log = telemetry::scrape();

        let (snap, report) = ProfileScraper::new(&session, &settings, &log)
            .scrape("https://www.reddit.com/user/alice/")
            .await
            .unwrap();

        assert_eq!(snap.total_posts, 7);
        assert_eq!(snap.posts[0].title.as_deref(), Some("Post number 0"));
        assert_eq!(snap.posts[6].index, 6);
        assert_eq!(snap.posts[0].subreddit.as_deref(), Some("rust"));
        assert_eq!(report.pages[0].found, 10);

        assert_eq!(snap.total_comments, 1);
        assert_eq!(snap.comments[0].body.as_deref(), Some("A thoughtful reply about lifetimes."));
        assert_eq!(report.pages[1].skipped, 1);
    }

    #[test]
    fn cap_is_configurable() {
        let html = posts_page(4);
        let h = extract_page(&html, &POSTS, SUBMITTED, 2, &telemetry::scrape());
        assert_eq!(h.items.len(), 2);
        assert_eq!(h.selector, Some("shreddit-post"));

        let h = extract_page(&html, &POSTS, SUBMITTED, 50, &telemetry::scrape());
        // four titled posts plus the untitled one
        assert_eq!(h.items.len(), 4);
        assert_eq!(h.skipped, 1);
    }
}
