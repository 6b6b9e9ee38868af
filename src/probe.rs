use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::Args;
use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};
use serde::Serialize;
use tokio::time::sleep;

use crate::browser::{BrowserError, ChromeSession, PageSession};
use crate::config::ScrapeSettings;
use crate::profile::url::{username_from_url, ProfilePages};
use crate::scrape::loader::dismiss_popups;
use crate::scrape::BrowserArgs;
use crate::telemetry::{self};
use crate::telemetry::ops::probe::Phase;
use crate::util::text::preview;

const PATTERNS: &[&str] = &[
    r#"class="[^"]*comment[^"]*""#,
    r#"data-testid="[^"]*comment[^"]*""#,
    r#"aria-label="[^"]*comment[^"]*""#,
    r#"shreddit-[^"]*comment[^"]*"#,
];

const CANDIDATES: &[&str] = &[
    "article",
    "div[class*='hover']",
    "div[class*='relative']",
    "shreddit-profile-comment",
    "*[aria-label*='comment']",
];

const MAX_MATCHES: usize = 5;
const PREVIEW_CHARS: usize = 200;

/// Dump how a user's comments page is structured, to refresh selectors.
#[derive(Args)]
pub struct ProbeCmd {
    profile_url: String,
    #[command(flatten)] browser: BrowserArgs,
}

#[derive(Debug, Serialize)]
pub struct PatternHits {
    pub pattern: &'static str,
    pub total: usize,
    pub samples: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SelectorHits {
    pub selector: &'static str,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_html: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub page_chars: usize,
    pub patterns: Vec<PatternHits>,
    pub selectors: Vec<SelectorHits>,
}

fn compiled() -> &'static [(&'static str, Regex)] {
    static RES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    RES.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|p| Some((*p, RegexBuilder::new(p).case_insensitive(true).build().ok()?)))
            .collect()
    })
}

/// Comment-ish attribute patterns in the raw source, first few matches each.
pub fn pattern_hits(source: &str) -> Vec<PatternHits> {
    compiled()
        .iter()
        .filter_map(|(pattern, re)| {
            let all: Vec<&str> = re.find_iter(source).map(|m| m.as_str()).collect();
            if all.is_empty() {
                return None;
            }
            Some(PatternHits {
                pattern: *pattern,
                total: all.len(),
                samples: all.iter().take(MAX_MATCHES).map(|s| s.to_string()).collect(),
            })
        })
        .collect()
}

/// Element counts for the structural candidates, with the first match's markup.
pub fn selector_hits(source: &str) -> Vec<SelectorHits> {
    let doc = Html::parse_document(source);
    CANDIDATES
        .iter()
        .filter_map(|css| {
            let sel = Selector::parse(css).ok()?;
            let found: Vec<_> = doc.select(&sel).collect();
            Some(SelectorHits {
                selector: *css,
                count: found.len(),
                first_html: found.first().map(|el| preview(&el.html(), PREVIEW_CHARS)),
            })
        })
        .collect()
}

pub fn analyze(url: &str, source: &str) -> ProbeReport {
    ProbeReport {
        url: url.to_string(),
        page_chars: source.chars().count(),
        patterns: pattern_hits(source),
        selectors: selector_hits(source),
    }
}

async fn load_source(session: &dyn PageSession, url: &str, settings: &ScrapeSettings) -> Result<String, BrowserError> {
    session.goto(url).await?;
    sleep(settings.comment_settle).await;
    dismiss_popups(session, settings.popup_pause).await;
    session.html().await
}

pub async fn run(args: ProbeCmd) -> Result<()> {
    let settings = args.browser.settings();
    let log = telemetry::probe();
    let _g = log.root_span_kv([("profile_url", args.profile_url.clone())]).entered();

    let username = username_from_url(&args.profile_url)?;
    let url = ProfilePages::new(&settings.base_url, &username).comments;

    let _s = log.span(&Phase::Launch).entered();
    let session = ChromeSession::launch(&settings.launch_options())
        .await
        .context("launch Chrome")?;
    drop(_s);

    let _s = log.span_kv(&Phase::Navigate, [("url", url.clone())]).entered();
    let loaded = load_source(&session, &url, &settings).await;
    drop(_s);
    if let Err(err) = session.close().await {
        log.warn(format!("browser did not close cleanly: {}", err));
    }
    let source = loaded.with_context(|| format!("load {}", url))?;

    let report = analyze(&url, &source);

    let _s = log.span(&Phase::Patterns).entered();
    for hit in &report.patterns {
        log.info(format!("Pattern {}: {} match(es) {:?}", hit.pattern, hit.total, hit.samples));
    }
    drop(_s);

    let _s = log.span(&Phase::Selectors).entered();
    for hit in &report.selectors {
        log.info(format!("Selector '{}': {} element(s)", hit.selector, hit.count));
        if let Some(html) = &hit.first_html {
            log.info(format!("  First element HTML: {}...", html));
        }
    }
    drop(_s);

    if telemetry::config::json_mode() {
        log.result(&report)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <shreddit-profile-comment data-testid="profile-comment">
          <article aria-label="Comment by alice" class="Comment-body relative">
            <div class="hover:bg-neutral relative"><p>Text</p></div>
          </article>
        </shreddit-profile-comment>
    </body></html>"#;

    #[test]
    fn patterns_are_case_insensitive_and_capped() {
        let hits = pattern_hits(PAGE);
        let class = hits.iter().find(|h| h.pattern.starts_with("class")).unwrap();
        assert_eq!(class.samples, vec![r#"class="Comment-body relative""#.to_string()]);
        assert!(hits.iter().any(|h| h.pattern.starts_with("aria-label") && h.total == 1));
        assert!(hits.iter().any(|h| h.pattern.starts_with("shreddit-")));

        let many = r#"<i class="comment"></i>"#.repeat(9);
        let hits = pattern_hits(&many);
        assert_eq!(hits[0].total, 9);
        assert_eq!(hits[0].samples.len(), MAX_MATCHES);
    }

    #[test]
    fn selector_counts_with_preview() {
        let hits = selector_hits(PAGE);
        let by = |s: &str| hits.iter().find(|h| h.selector == s).unwrap();
        assert_eq!(by("article").count, 1);
        assert_eq!(by("shreddit-profile-comment").count, 1);
        assert_eq!(by("div[class*='hover']").count, 1);
        assert_eq!(by("div[class*='relative']").count, 1);
        assert_eq!(by("*[aria-label*='comment']").count, 0);
        assert!(by("article").first_html.as_deref().unwrap().starts_with("<article"));
        assert!(by("shreddit-profile-comment").first_html.as_deref().unwrap().chars().count() <= PREVIEW_CHARS);
    }

    #[test]
    fn nothing_found_on_blank_page() {
        let report = analyze("https://www.reddit.com/user/a/comments/", "<html></html>");
        assert!(report.patterns.is_empty());
        assert!(report.selectors.iter().all(|s| s.count == 0 && s.first_html.is_none()));
    }
}
