use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::time::deserialize_timestamp;

/// One post or comment lifted off a profile page.
///
/// Posts are keyed on `title`, comments on `body`; the extractor never emits an
/// item whose primary field is missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScrapedItem {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, alias = "content", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subreddit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, alias = "post_url", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_context: Option<String>,
}

impl ScrapedItem {
    pub fn new(index: usize) -> Self {
        Self { index, ..Self::default() }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Comment,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Post => "post",
            ItemKind::Comment => "comment",
        }
    }

    /// The field an item of this kind must carry to be kept.
    pub fn primary<'a>(&self, item: &'a ScrapedItem) -> Option<&'a str> {
        let v = match self {
            ItemKind::Post => item.title.as_deref(),
            ItemKind::Comment => item.body.as_deref(),
        };
        v.filter(|s| !s.trim().is_empty())
    }
}

/// Everything scraped for one user in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub username: String,
    pub profile_url: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub posts: Vec<ScrapedItem>,
    #[serde(default)]
    pub comments: Vec<ScrapedItem>,
    #[serde(default)]
    pub total_posts: usize,
    #[serde(default)]
    pub total_comments: usize,
}

impl ProfileSnapshot {
    pub fn assemble(
        username: impl Into<String>,
        profile_url: impl Into<String>,
        scraped_at: DateTime<Utc>,
        posts: Vec<ScrapedItem>,
        comments: Vec<ScrapedItem>,
    ) -> Self {
        Self {
            username: username.into(),
            profile_url: profile_url.into(),
            scraped_at,
            total_posts: posts.len(),
            total_comments: comments.len(),
            posts,
            comments,
        }
    }
}
