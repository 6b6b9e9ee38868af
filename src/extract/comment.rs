use scraper::{ElementRef, Selector};
use url::Url;

use super::{absolutize, accept, first_hit, first_match, node_text, strip_subreddit_prefix, Probe};
use crate::profile::ScrapedItem;

pub const CONTAINERS: &[&str] = &[
    "shreddit-profile-comment",
    "article[aria-label*='comment']",
    "div[class*='hover:bg-neutral-background-hover'][class*='relative']",
    "div[data-testid='comment']",
    ".Comment",
    "article[class*='mb-0'][class*='w-full']",
];

pub const FALLBACK_CONTAINERS: &[&str] = &[
    "div[class*='text-12'][class*='relative']",
    "div[class*='post-revision-content']",
    "div[aria-label*='comment']",
];

pub const READY: &[&str] = &[
    "shreddit-profile-comment",
    "article[aria-label*='comment']",
    "div[data-testid='comment']",
    ".Comment",
    "div[class*='hover:bg-neutral-background-hover']",
];

const BODY: &[Probe] = &[
    Probe::text("div[class*='post-revision-content']"),
    Probe::text("div[slot='comment']"),
    Probe::text("div[data-testid='comment-text']"),
    Probe::text("div[class*='text-neutral-content-strong'][class*='overflow-hidden']"),
    Probe::text("div[class*='usertext-body']"),
    Probe::text("div p"),
    Probe::text("div[class*='md']"),
    Probe::text("[slot='text-body']"),
    Probe::text("div[class*='relative'] div[class*='text-neutral-content-strong']"),
    Probe::text("div[class*='overflow-hidden'] p"),
];

const SUBREDDIT: &[Probe] = &[
    Probe::text("a[href*='/r/'][class*='hover:underline']"),
    Probe::text("a[href*='/r/']"),
    Probe::text("[data-testid='subreddit-name']"),
    Probe::text("faceplate-tracker a[href*='/r/']"),
];

const SCORE: &[Probe] = &[
    Probe::text("shreddit-score"),
    Probe::text("div[class*='ml-[22px]'] span"),
    Probe::text("faceplate-number"),
    Probe::text(".score"),
    Probe::text("[aria-label*='upvote']"),
    Probe::text("div[class*='text-12'] span"),
    Probe::own_attr("score"),
];

const TIMESTAMP: &[Probe] = &[
    Probe::attr_or_text("faceplate-timeago", "datetime"),
    Probe::attr_or_text("time", "datetime"),
    Probe::attr_or_text("[data-testid='comment-timestamp']", "datetime"),
    Probe::attr_or_text("div[class*='text-12'] time", "datetime"),
    Probe::attr_or_text("span[class*='text-12']", "datetime"),
];

const CONTEXT: &[Probe] = &[
    Probe::text("a[href*='/comments/'][class*='hover:underline']"),
    Probe::text("a[href*='/comments/']"),
    Probe::text("[data-testid='post-title']"),
    Probe::text("div[class*='text-12'] a"),
];

const METADATA: &str = "div[class*='text-12'] span";

/// Extract one comment; `None` unless a body longer than 10 chars is found.
pub fn extract_comment(el: ElementRef<'_>, index: usize, base: Option<&Url>) -> Option<ScrapedItem> {
    let body = first_match(el, BODY, accept::longer_than_10)?;

    let mut item = ScrapedItem::new(index);
    item.body = Some(body);
    item.subreddit = first_match(el, SUBREDDIT, accept::mentions_subreddit).map(|s| strip_subreddit_prefix(&s));
    item.score = first_match(el, SCORE, accept::digits);
    item.timestamp = first_match(el, TIMESTAMP, accept::relative_or_iso_time);

    if let Some(hit) = first_hit(el, CONTEXT, accept::longer_than_5) {
        item.url = hit.node.value().attr("href").map(|href| absolutize(href, base));
        item.post_context = Some(hit.value);
    }

    apply_metadata(el, &mut item);
    Some(item)
}

// Inline metadata spans win over the probes above, last one wins.
fn apply_metadata(el: ElementRef<'_>, item: &mut ScrapedItem) {
    let Ok(sel) = Selector::parse(METADATA) else { return };
    for span in el.select(&sel) {
        let text = node_text(span);
        let lower = text.to_lowercase();
        if lower.contains("point") {
            item.score = Some(text);
        } else if lower.contains("ago") {
            item.timestamp = Some(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::collect;
    use scraper::Html;

    const PROFILE_COMMENTS: &str = r#"
    <html><body>
      <shreddit-profile-comment>
        <div class="text-12 relative">
          <a class="hover:underline" href="/r/Screenwriting/">r/Screenwriting</a>
          <a class="hover:underline" href="/r/Screenwriting/comments/abc/some_thread/">Some thread title</a>
          <span>•</span>
          <time datetime="2024-05-01T10:00:00.000Z">1 yr. ago</time>
        </div>
        <div id="-post-rtjson-content" class="md post-revision-content">
          <p>Short</p>
        </div>
        <div slot="comment"><p>Congrats to everyone who got in this year!</p></div>
        <shreddit-score>12</shreddit-score>
      </shreddit-profile-comment>
      <shreddit-profile-comment>
        <div slot="comment"><p>too short</p></div>
      </shreddit-profile-comment>
    </body></html>"#;

    #[test]
    fn extracts_profile_comment() {
        let doc = Html::parse_document(PROFILE_COMMENTS);
        let found = collect(&doc, CONTAINERS, FALLBACK_CONTAINERS);
        assert_eq!(found.selector, Some("shreddit-profile-comment"));
        assert_eq!(found.elements.len(), 2);

        let base = Url::parse("https://www.reddit.com/user/alice/comments/").unwrap();
        let c = extract_comment(found.elements[0], 0, Some(&base)).unwrap();
        // first probe's node is too short, the next probe supplies the body
        assert_eq!(c.body.as_deref(), Some("Congrats to everyone who got in this year!"));
        assert_eq!(c.subreddit.as_deref(), Some("Screenwriting"));
        assert_eq!(c.score.as_deref(), Some("12"));
        assert_eq!(c.timestamp.as_deref(), Some("2024-05-01T10:00:00.000Z"));
        assert_eq!(c.post_context.as_deref(), Some("Some thread title"));
        assert_eq!(
            c.url.as_deref(),
            Some("https://www.reddit.com/r/Screenwriting/comments/abc/some_thread/")
        );

        assert!(extract_comment(found.elements[1], 1, Some(&base)).is_none());
    }

    #[test]
    fn metadata_spans_override_score_and_time() {
        let doc = Html::parse_document(
            r#"<div data-testid="comment">
                 <div class="usertext-body"><p>Old layout comment with enough text.</p></div>
                 <div class="text-12"><span>5 points</span><span>3 days ago</span></div>
               </div>"#,
        );
        let found = collect(&doc, CONTAINERS, FALLBACK_CONTAINERS);
        assert_eq!(found.selector, Some("div[data-testid='comment']"));
        let c = extract_comment(found.elements[0], 3, None).unwrap();
        assert_eq!(c.index, 3);
        assert_eq!(c.body.as_deref(), Some("Old layout comment with enough text."));
        assert_eq!(c.score.as_deref(), Some("5 points"));
        assert_eq!(c.timestamp.as_deref(), Some("3 days ago"));
        assert!(c.subreddit.is_none());
    }

    #[test]
    fn body_threshold_is_strictly_more_than_ten_chars() {
        let doc = Html::parse_document(
            r#"<div data-testid="comment"><div slot="comment">0123456789</div></div>"#,
        );
        let found = collect(&doc, CONTAINERS, FALLBACK_CONTAINERS);
        assert!(extract_comment(found.elements[0], 0, None).is_none());
    }
}
