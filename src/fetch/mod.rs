// src/fetch/mod.rs
//! Content fetchers: each returns human-readable text with announcements
//! separated by blank lines.

pub mod social;
pub mod website;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;

pub use social::SocialFeedFetcher;
pub use website::WebsiteFetcher;

#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_text(&self) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Fixed text, for tests and offline runs.
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    text: String,
}

impl StaticFetcher {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait::async_trait]
impl ContentFetcher for StaticFetcher {
    async fn fetch_text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Runs every fetcher in order and joins their output with a blank line.
/// Any failure aborts the whole fetch so a partial blob never reaches the store.
pub struct CombinedFetcher {
    fetchers: Vec<Box<dyn ContentFetcher>>,
}

impl CombinedFetcher {
    pub fn new(fetchers: Vec<Box<dyn ContentFetcher>>) -> Self {
        Self { fetchers }
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

#[async_trait::async_trait]
impl ContentFetcher for CombinedFetcher {
    async fn fetch_text(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(self.fetchers.len());
        for f in &self.fetchers {
            let text = f
                .fetch_text()
                .await
                .with_context(|| format!("fetcher `{}`", f.name()))?;
            let text = text.trim();
            tracing::debug!(target: "announcements", fetcher = f.name(), bytes = text.len(), "fetched");
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        Ok(parts.join("\n\n"))
    }

    fn name(&self) -> &'static str {
        "combined"
    }
}

/// Single-line text: decode entities, strip tags, collapse whitespace.
/// Blank lines inside an item would split it into two announcements.
pub fn normalize_inline(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z!][^>]*>").unwrap());
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());

    let out = re_tags.replace_all(s, "");
    let out = html_escape::decode_html_entities(&out).to_string();
    let out = out
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    re_ws.replace_all(&out, " ").trim().to_string()
}
