//! Selector-fallback extraction over a rendered HTML snapshot.
//!
//! Every logical field is an ordered list of [`Probe`]s plus an acceptance
//! predicate. Probes are tried in order; within a probe every matching node is
//! considered and the first whose value passes wins. A field with no accepted
//! value is simply absent.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::util::text::normalize;

pub mod comment;
pub mod post;

pub use comment::extract_comment;
pub use post::extract_post;

/// Where a probe reads its value from on a matched node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// Normalized descendant text.
    Text,
    /// Raw attribute value.
    Attr(&'static str),
    /// Attribute if present and non-empty, else text.
    AttrOrText(&'static str),
}

#[derive(Copy, Clone, Debug)]
pub struct Probe {
    /// `None` reads from the element itself.
    pub selector: Option<&'static str>,
    pub source: Source,
}

impl Probe {
    pub const fn text(selector: &'static str) -> Self {
        Probe { selector: Some(selector), source: Source::Text }
    }
    pub const fn attr(selector: &'static str, attr: &'static str) -> Self {
        Probe { selector: Some(selector), source: Source::Attr(attr) }
    }
    pub const fn attr_or_text(selector: &'static str, attr: &'static str) -> Self {
        Probe { selector: Some(selector), source: Source::AttrOrText(attr) }
    }
    pub const fn own_attr(attr: &'static str) -> Self {
        Probe { selector: None, source: Source::Attr(attr) }
    }
}

pub type Accept = fn(&str) -> bool;

/// A matched node and the value it yielded.
pub struct Hit<'a> {
    pub node: ElementRef<'a>,
    pub value: String,
}

/// First accepted value across `probes`, in order.
pub fn first_match(el: ElementRef<'_>, probes: &[Probe], accept: Accept) -> Option<String> {
    first_hit(el, probes, accept).map(|h| h.value)
}

pub fn first_hit<'a>(el: ElementRef<'a>, probes: &[Probe], accept: Accept) -> Option<Hit<'a>> {
    for probe in probes {
        let nodes: Vec<ElementRef<'a>> = match probe.selector {
            None => vec![el],
            Some(css) => match Selector::parse(css) {
                Ok(sel) => el.select(&sel).collect(),
                Err(_) => {
                    debug!(selector = css, "skipping unparseable selector");
                    continue;
                }
            },
        };
        for node in nodes {
            let Some(value) = read(node, probe.source) else { continue };
            if accept(&value) {
                return Some(Hit { node, value });
            }
        }
    }
    None
}

fn read(node: ElementRef<'_>, source: Source) -> Option<String> {
    match source {
        Source::Text => Some(node_text(node)),
        Source::Attr(name) => node.value().attr(name).map(|v| v.trim().to_string()),
        Source::AttrOrText(name) => match node.value().attr(name).map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => Some(node_text(node)),
        },
    }
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Rendered-ish text: block children start on their own line, `<br>` breaks.
pub fn node_text(node: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_text(node, &mut out);
    normalize(&out)
}

fn push_text(node: ElementRef<'_>, out: &mut String) {
    for child in node.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(el) = ElementRef::wrap(child) {
            let name = el.value().name();
            if name == "br" {
                out.push('\n');
                continue;
            }
            let block = BLOCK_TAGS.contains(&name);
            if block { out.push('\n'); }
            push_text(el, out);
            if block { out.push('\n'); }
        }
    }
}

/// Resolve an href against the page it came from.
pub fn absolutize(href: &str, base: Option<&Url>) -> String {
    match base.and_then(|b| b.join(href).ok()) {
        Some(u) => u.to_string(),
        None => href.to_string(),
    }
}

/// Elements found by the first selector in a prioritized list.
pub struct Collected<'a> {
    pub selector: Option<&'static str>,
    pub elements: Vec<ElementRef<'a>>,
}

/// Try `primary` selectors in order, then `fallback`; the first selector that
/// matches at least one element wins.
pub fn collect<'a>(doc: &'a Html, primary: &[&'static str], fallback: &[&'static str]) -> Collected<'a> {
    for css in primary.iter().chain(fallback.iter()) {
        let Ok(sel) = Selector::parse(css) else {
            debug!(selector = *css, "skipping unparseable selector");
            continue;
        };
        let elements: Vec<ElementRef<'a>> = doc.select(&sel).collect();
        if !elements.is_empty() {
            return Collected { selector: Some(*css), elements };
        }
    }
    Collected { selector: None, elements: Vec::new() }
}

// Acceptance predicates shared by the field tables.
pub mod accept {
    pub fn non_empty(s: &str) -> bool {
        !s.trim().is_empty()
    }

    pub fn longer_than_10(s: &str) -> bool {
        s.trim().chars().count() > 10
    }

    pub fn longer_than_5(s: &str) -> bool {
        s.trim().chars().count() > 5
    }

    pub fn score_text(s: &str) -> bool {
        let s = s.trim();
        !s.is_empty() && s != "•"
    }

    pub fn digits(s: &str) -> bool {
        score_text(s) && s.trim().chars().all(|c| c.is_ascii_digit())
    }

    pub fn permalink(s: &str) -> bool {
        s.contains("/comments/")
    }

    pub fn mentions_subreddit(s: &str) -> bool {
        s.contains("r/")
    }

    pub fn relative_or_iso_time(s: &str) -> bool {
        s.contains("ago") || s.contains('T')
    }

    pub fn mentions_comments(s: &str) -> bool {
        s.to_lowercase().contains("comment")
    }
}

pub fn strip_subreddit_prefix(s: &str) -> String {
    s.replace("r/", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(doc: &Html) -> ElementRef<'_> {
        let sel = Selector::parse("#root").unwrap();
        doc.select(&sel).next().unwrap()
    }

    #[test]
    fn block_children_land_on_separate_lines() {
        let doc = Html::parse_document(
            r#"<div id="root"><p>First.</p><p>Second.</p><span>in</span><span>line</span>a<br>b</div>"#,
        );
        assert_eq!(node_text(root(&doc)), "First.\nSecond.\ninlinea\nb");
    }

    #[test]
    fn first_selector_in_list_order_wins() {
        let doc = Html::parse_document(
            r#"<div id="root"><h1>From h1</h1><h3>From h3</h3></div>"#,
        );
        let probes = [Probe::text("h3"), Probe::text("h1")];
        assert_eq!(first_match(root(&doc), &probes, accept::non_empty).as_deref(), Some("From h3"));
        let probes = [Probe::text("h1"), Probe::text("h3")];
        assert_eq!(first_match(root(&doc), &probes, accept::non_empty).as_deref(), Some("From h1"));
    }

    #[test]
    fn rejected_candidates_fall_through_to_later_nodes_and_selectors() {
        let doc = Html::parse_document(
            r#"<div id="root"><p>short</p><p>this one is long enough</p><span>unused</span></div>"#,
        );
        let probes = [Probe::text("p"), Probe::text("span")];
        assert_eq!(
            first_match(root(&doc), &probes, accept::longer_than_10).as_deref(),
            Some("this one is long enough")
        );
        let probes = [Probe::text("em"), Probe::text("span")];
        assert_eq!(first_match(root(&doc), &probes, accept::non_empty).as_deref(), Some("unused"));
    }

    #[test]
    fn absent_when_nothing_matches() {
        let doc = Html::parse_document(r#"<div id="root"><p></p></div>"#);
        let probes = [Probe::text("p"), Probe::text("h3"), Probe::text("button:contains('x')")];
        assert!(first_match(root(&doc), &probes, accept::non_empty).is_none());
    }

    #[test]
    fn attr_or_text_prefers_attribute() {
        let doc = Html::parse_document(
            r#"<div id="root"><time datetime="2024-05-01T10:00:00Z">1 yr. ago</time><time>2 days ago</time></div>"#,
        );
        let probes = [Probe::attr_or_text("time", "datetime")];
        assert_eq!(
            first_match(root(&doc), &probes, accept::non_empty).as_deref(),
            Some("2024-05-01T10:00:00Z")
        );
    }

    #[test]
    fn own_attr_reads_the_element_itself() {
        let doc = Html::parse_document(r#"<div id="root" data-x="self value"></div>"#);
        let probes = [Probe::own_attr("data-x")];
        assert_eq!(first_match(root(&doc), &probes, accept::non_empty).as_deref(), Some("self value"));
    }

    #[test]
    fn collect_uses_first_selector_with_results() {
        let doc = Html::parse_document(
            r#"<body><div class="Post">a</div><div class="Post">b</div><a href="/r/x/comments/1/">c</a></body>"#,
        );
        let got = collect(&doc, &["shreddit-post", ".Post"], &["a[href*='/comments/']"]);
        assert_eq!(got.selector, Some(".Post"));
        assert_eq!(got.elements.len(), 2);

        let got = collect(&doc, &["shreddit-post"], &["a[href*='/comments/']"]);
        assert_eq!(got.selector, Some("a[href*='/comments/']"));

        let empty = Html::parse_document("<body></body>");
        let got = collect(&empty, &["shreddit-post"], &["article"]);
        assert!(got.selector.is_none());
        assert!(got.elements.is_empty());
    }

    #[test]
    fn predicates() {
        assert!(accept::digits("42"));
        assert!(!accept::digits("42 points"));
        assert!(!accept::score_text("•"));
        assert!(accept::relative_or_iso_time("3 days ago"));
        assert!(accept::relative_or_iso_time("2024-01-01T00:00:00Z"));
        assert!(!accept::relative_or_iso_time("yesterday"));
        assert!(!accept::longer_than_10("ten chars!"));
        assert!(accept::longer_than_10("eleven char"));
    }

    #[test]
    fn absolutize_joins_relative_links() {
        let base = Url::parse("https://www.reddit.com/user/alice/submitted/").unwrap();
        assert_eq!(
            absolutize("/r/rust/comments/abc/t/", Some(&base)),
            "https://www.reddit.com/r/rust/comments/abc/t/"
        );
        assert_eq!(absolutize("/r/rust/", None), "/r/rust/");
    }
}
