use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileUrlError {
    #[error("invalid Reddit profile URL: {0}")]
    Invalid(String),
}

fn patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"reddit\.com/u/([^/?#]+)").expect("static regex"),
            Regex::new(r"reddit\.com/user/([^/?#]+)").expect("static regex"),
        ]
    })
}

/// Pull `<name>` out of `.../u/<name>/` or `.../user/<name>/`.
pub fn username_from_url(profile_url: &str) -> Result<String, ProfileUrlError> {
    for re in patterns() {
        if let Some(name) = re.captures(profile_url).and_then(|c| c.get(1)) {
            return Ok(name.as_str().to_string());
        }
    }
    Err(ProfileUrlError::Invalid(profile_url.to_string()))
}

/// Listing pages for one user, rooted at a configurable site base.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfilePages {
    pub submitted: String,
    pub comments: String,
}

impl ProfilePages {
    pub fn new(base_url: &str, username: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            submitted: format!("{base}/user/{username}/submitted/"),
            comments: format!("{base}/user/{username}/comments/"),
        }
    }
}
