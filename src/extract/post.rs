use scraper::ElementRef;
use url::Url;

use super::{absolutize, accept, first_match, strip_subreddit_prefix, Probe};
use crate::profile::ScrapedItem;

/// Listing selectors, most specific layout first.
pub const CONTAINERS: &[&str] = &[
    "shreddit-post",
    "article[data-testid='post-container']",
    "[data-testid='post-container']",
    "div[data-click-id='body']",
    ".Post",
    "[data-adclicklocation='title']",
];

/// Used only when no container selector matches.
pub const FALLBACK_CONTAINERS: &[&str] = &["a[href*='/comments/']"];

/// Presence of any of these means the submitted page has rendered.
pub const READY: &[&str] = &[
    "shreddit-post",
    "[data-testid='post-container']",
    "article[data-testid='post-container']",
    "div[data-click-id='body']",
];

const TITLE: &[Probe] = &[
    Probe::text("h3"),
    Probe::text("[data-testid='post-title']"),
    Probe::text("[slot='title']"),
    Probe::text("a[data-testid='post-title']"),
    Probe::text("[data-adclicklocation='title']"),
    Probe::text(".Post-title"),
    Probe::text("h1"),
    Probe::text("[data-click-id='title']"),
    Probe::own_attr("post-title"),
];

const PERMALINK: &[Probe] = &[
    Probe::attr("a[href*='/comments/']", "href"),
    Probe::attr("a[data-testid='post-title']", "href"),
    Probe::attr("[data-click-id='title'] a", "href"),
    Probe::own_attr("permalink"),
    Probe::own_attr("href"),
];

const SUBREDDIT: &[Probe] = &[
    Probe::text("a[href*='/r/'][data-testid='subreddit-name']"),
    Probe::text("a[href*='/r/']"),
    Probe::text("[data-testid='subreddit-name']"),
    Probe::text("faceplate-tracker a[href*='/r/']"),
    Probe::own_attr("subreddit-prefixed-name"),
];

const SCORE: &[Probe] = &[
    Probe::text("shreddit-score"),
    Probe::text("[data-testid='vote-arrows'] span"),
    Probe::text("faceplate-number"),
    Probe::text(".score"),
    Probe::text("[aria-label*='upvote']"),
    Probe::own_attr("score"),
];

const TIMESTAMP: &[Probe] = &[
    Probe::attr_or_text("faceplate-timeago", "datetime"),
    Probe::attr_or_text("[data-testid='post-timestamp']", "datetime"),
    Probe::attr_or_text("time", "datetime"),
    Probe::attr_or_text("[data-testid='post-metadata'] time", "datetime"),
    Probe::own_attr("created-timestamp"),
];

const CONTENT: &[Probe] = &[
    Probe::text("[data-testid='post-content']"),
    Probe::text(".usertext-body"),
    Probe::text("[slot='text-body']"),
    Probe::text("div[data-adclicklocation='media']"),
];

const COMMENT_COUNT: &[Probe] = &[
    Probe::text("a[href*='/comments/'] span"),
    Probe::text("[data-testid='comment-count']"),
    Probe::text("a[data-click-id='comments']"),
];

/// Extract one post; `None` when no title could be found.
pub fn extract_post(el: ElementRef<'_>, index: usize, base: Option<&Url>) -> Option<ScrapedItem> {
    let title = first_match(el, TITLE, accept::non_empty)?;

    let mut item = ScrapedItem::new(index);
    item.title = Some(title);
    item.url = first_match(el, PERMALINK, accept::permalink).map(|href| absolutize(&href, base));
    item.subreddit = first_match(el, SUBREDDIT, accept::mentions_subreddit).map(|s| strip_subreddit_prefix(&s));
    item.score = first_match(el, SCORE, accept::score_text);
    item.timestamp = first_match(el, TIMESTAMP, accept::non_empty);
    item.body = first_match(el, CONTENT, accept::non_empty);
    item.comment_count = first_match(el, COMMENT_COUNT, accept::mentions_comments);
    Some(item)
}
