use std::collections::BTreeSet;

use serde::Serialize;

use crate::profile::ProfileSnapshot;

pub const DEFAULT_SAMPLE_LIMIT: usize = 20;

/// Headline numbers the prompt opens with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub username: String,
    pub total_posts: usize,
    pub total_comments: usize,
    /// Distinct, sorted, blanks removed.
    pub subreddits: Vec<String>,
}

pub fn analyze(snapshot: &ProfileSnapshot) -> Analysis {
    let subreddits: BTreeSet<String> = snapshot
        .posts
        .iter()
        .chain(snapshot.comments.iter())
        .filter_map(|item| item.subreddit.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Analysis {
        username: snapshot.username.clone(),
        total_posts: snapshot.posts.len(),
        total_comments: snapshot.comments.len(),
        subreddits: subreddits.into_iter().collect(),
    }
}

/// Posts first (`POST: <title> - <content>`), then comments (`COMMENT: <body>`).
pub fn content_lines(snapshot: &ProfileSnapshot) -> Vec<String> {
    let posts = snapshot.posts.iter().map(|p| {
        format!(
            "POST: {} - {}",
            p.title.as_deref().unwrap_or_default(),
            p.body.as_deref().unwrap_or_default()
        )
    });
    let comments = snapshot
        .comments
        .iter()
        .map(|c| format!("COMMENT: {}", c.body.as_deref().unwrap_or_default()));
    posts.chain(comments).collect()
}

/// Full persona request for `snapshot`, sampling at most `sample_limit` lines.
pub fn build_prompt(snapshot: &ProfileSnapshot, sample_limit: usize) -> String {
    let analysis = analyze(snapshot);
    let mut lines = content_lines(snapshot);
    lines.truncate(sample_limit);
    render(&analysis, &lines.join("\n"))
}

fn render(a: &Analysis, content: &str) -> String {
    format!(
        r#"Based on the following Reddit user data, create a detailed user persona in the style of a professional UX/Marketing persona document.

USERNAME: {username}
TOTAL POSTS: {posts}
TOTAL COMMENTS: {comments}
ACTIVE SUBREDDITS: {subreddits}

CONTENT ANALYSIS:
{content}

Create a comprehensive persona that includes:

1. **PERSONA NAME & TAGLINE**: Create a realistic name and one-line description

2. **DEMOGRAPHICS**:
   - Age range
   - Location (inferred from content)
   - Occupation (based on expertise shown)
   - Education level

3. **PSYCHOGRAPHICS**:
   - Personality traits
   - Values and motivations
   - Lifestyle preferences
   - Communication style

4. **DIGITAL BEHAVIOR**:
   - Social media usage patterns
   - Content consumption habits
   - Online community participation
   - Preferred platforms and tools

5. **PROFESSIONAL PROFILE**:
   - Career focus and expertise
   - Industry knowledge level
   - Professional goals
   - Skills and competencies

6. **PAIN POINTS & FRUSTRATIONS**:
   - Common challenges they face
   - Industry-specific frustrations
   - Information gaps

7. **GOALS & MOTIVATIONS**:
   - Short-term objectives
   - Long-term aspirations
   - What drives their decisions

8. **CONTENT PREFERENCES**:
   - Types of content they engage with
   - Preferred information sources
   - Learning preferences

9. **QUOTE**: A representative quote that captures their voice and perspective

10. **KEY INSIGHTS**: 3-5 bullet points summarizing the most important things to know about this persona

Format the response as a professional persona document with clear sections and actionable insights. Base all conclusions on evidence from their actual Reddit activity and communication style.
"#,
        username = a.username,
        posts = a.total_posts,
        comments = a.total_comments,
        subreddits = a.subreddits.join(", "),
        content = content,
    )
}
