// src/config/stories.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::Story;

pub const ENV_STORIES_PATH: &str = "FEED_STORIES_PATH";

const DEFAULT_STORIES: &[&str] = &[
    "Hikers report a grey lady drifting along the old quarry path at dusk.",
    "Lighthouse keeper logs three knocks on the lamp room door, again.",
    "Town archive confirms the 1893 ledger really was signed in invisible ink.",
    "Night bus driver refuses the route past the abandoned chapel.",
    "Local bakery swears the ovens preheat themselves every Friday the 13th.",
    "Schoolchildren film a cold spot moving through the gymnasium.",
    "Cemetery groundskeeper finds fresh footprints that end mid-path.",
    "Radio amateurs pick up a 1940s dance band on an unused frequency.",
];

/// The pool shipped with the binary.
pub fn default_stories() -> Vec<Story> {
    DEFAULT_STORIES.iter().map(|s| s.to_string()).collect()
}

/// Load the story pool from an explicit path. Supports TOML or JSON formats.
pub fn load_stories_from(path: &Path) -> Result<Vec<Story>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading stories from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_stories(&content, ext.as_str())
}

/// Load the story pool using env var + fallbacks:
/// 1) $FEED_STORIES_PATH
/// 2) config/stories.toml
/// 3) config/stories.json
/// 4) built-in pool
pub fn load_stories_default() -> Result<Vec<Story>> {
    if let Ok(p) = std::env::var(ENV_STORIES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_stories_from(&pb);
        }
        return Err(anyhow!("{ENV_STORIES_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/stories.toml");
    if toml_p.exists() {
        return load_stories_from(&toml_p);
    }
    let json_p = PathBuf::from("config/stories.json");
    if json_p.exists() {
        return load_stories_from(&json_p);
    }
    Ok(default_stories())
}

fn parse_stories(s: &str, hint_ext: &str) -> Result<Vec<Story>> {
    if hint_ext == "toml" {
        return parse_toml(s);
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    parse_toml(s).map_err(|_| anyhow!("unsupported stories format"))
}

fn parse_toml(s: &str) -> Result<Vec<Story>> {
    #[derive(serde::Deserialize)]
    struct TomlStories {
        stories: Vec<String>,
    }
    let v: TomlStories = toml::from_str(s)?;
    Ok(clean_list(v.stories))
}

fn parse_json(s: &str) -> Result<Vec<Story>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop empties and duplicates; keeps first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|it| it.trim().to_string())
        .filter(|it| !it.is_empty() && seen.insert(it.clone()))
        .collect()
}
