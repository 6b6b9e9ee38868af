use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::types::ProfileSnapshot;

pub fn default_path(username: &str) -> PathBuf {
    PathBuf::from(format!("{username}_scraped_data.json"))
}

/// Write the snapshot once as indented UTF-8 JSON.
pub fn save(snapshot: &ProfileSnapshot, path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(snapshot).context("serialize snapshot")?;
    fs::write(path, body).with_context(|| format!("write snapshot to {}", path.display()))?;
    Ok(())
}

pub fn load(path: &Path) -> Result<ProfileSnapshot> {
    let raw = fs::read_to_string(path).with_context(|| format!("read snapshot {}", path.display()))?;
    let snap = serde_json::from_str(&raw).with_context(|| format!("parse snapshot {}", path.display()))?;
    Ok(snap)
}
