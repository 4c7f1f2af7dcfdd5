// src/fetch/social.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use super::{normalize_inline, ContentFetcher};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// `YYYY-MM-DD` of an RFC 2822 timestamp, in UTC.
fn rfc2822_to_ymd(ts: &str) -> Option<String> {
    let dt = OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()?
        .to_offset(UtcOffset::UTC);
    Some(format!(
        "{:04}-{:02}-{:02}",
        dt.year(),
        u8::from(dt.month()),
        dt.day()
    ))
}

/// Posts of the project's social account, read from an RSS mirror of the feed.
///
/// Each item becomes one block `"{label} {date}: {text}"`. The label carries
/// the platform name (e.g. `"Twitter @MANTRA_Chain"`) so the parser tags the
/// block as social.
pub struct SocialFeedFetcher {
    label: String,
    limit: usize,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl SocialFeedFetcher {
    pub fn from_fixture(label: impl Into<String>, xml: &str) -> Self {
        Self {
            label: label.into(),
            limit: 20,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            limit: 20,
            mode: Mode::Http {
                url: url.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    /// Keep at most `limit` newest items (feeds list newest first).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn render(&self, xml: &str) -> Result<String> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing social feed xml")?;

        let mut blocks = Vec::new();
        for it in rss.channel.item.into_iter().take(self.limit) {
            // Mirrors often repeat the text in title and description.
            let body = match (it.description.as_deref(), it.title.as_deref()) {
                (Some(d), _) if !normalize_inline(d).is_empty() => normalize_inline(d),
                (_, Some(t)) => normalize_inline(t),
                _ => String::new(),
            };
            if body.is_empty() {
                continue;
            }
            let block = match it.pub_date.as_deref().and_then(rfc2822_to_ymd) {
                Some(day) => format!("{} {}: {}", self.label, day, body),
                None => format!("{}: {}", self.label, body),
            };
            blocks.push(block);
        }
        Ok(blocks.join("\n\n"))
    }
}

#[async_trait]
impl ContentFetcher for SocialFeedFetcher {
    async fn fetch_text(&self) -> Result<String> {
        match &self.mode {
            Mode::Fixture(s) => self.render(s),
            Mode::Http { url, client } => {
                let body = match client.get(url.as_str()).send().await {
                    Ok(resp) => resp
                        .error_for_status()
                        .context("social feed http status")?
                        .text()
                        .await
                        .context("social feed http .text()")?,
                    Err(e) => {
                        tracing::warn!(target: "announcements", error = ?e, fetcher = "social", "feed http error");
                        return Err(e).context("social feed http get()");
                    }
                };
                self.render(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "social"
    }
}

/// XML has no named entities beyond the basic five; mirrors still emit HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
