// src/fetch/website.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use super::ContentFetcher;

/// CSS selector matching one announcement on the page.
pub const DEFAULT_CONTAINER: &str = "article";

/// Never part of an announcement's text.
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "svg", "template", "nav", "footer", "button", "form",
];
const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];
const BREAKS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "section", "header", "tr", "td", "table", "br", "hr",
    "blockquote", "figcaption", "time",
];

/// Announcements page of the project website, one text block per container.
pub struct WebsiteFetcher {
    container: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
        timeout: Duration,
    },
}

impl WebsiteFetcher {
    pub fn from_fixture(html: &str) -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            mode: Mode::Fixture(html.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            mode: Mode::Http {
                url: url.into(),
                client: reqwest::Client::new(),
                timeout: Duration::from_secs(20),
            },
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        if let Mode::Http { timeout, .. } = &mut self.mode {
            *timeout = Duration::from_secs(secs);
        }
        self
    }

    /// Use `css` to find announcement containers instead of `<article>`.
    pub fn with_container(mut self, css: &str) -> Result<Self> {
        parse_selector(css)?;
        self.container = css.to_string();
        Ok(self)
    }

    fn render(&self, html: &str) -> Result<String> {
        let container = parse_selector(&self.container)?;
        let text = html_to_blocks(html, &container);
        if text.is_empty() {
            tracing::debug!(target: "announcements", container = %self.container, "no announcement containers on page");
        }
        Ok(text)
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid container selector `{css}`: {e:?}"))
}

#[async_trait]
impl ContentFetcher for WebsiteFetcher {
    async fn fetch_text(&self) -> Result<String> {
        match &self.mode {
            Mode::Fixture(html) => self.render(html),
            Mode::Http {
                url,
                client,
                timeout,
            } => {
                let resp = client
                    .get(url.as_str())
                    .timeout(*timeout)
                    .send()
                    .await
                    .with_context(|| format!("website GET {url}"))?
                    .error_for_status()
                    .with_context(|| format!("website GET {url}"))?;
                let body = resp.text().await.context("website .text()")?;
                self.render(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "website"
    }
}

/// One blank-line separated block per element matching `container`.
///
/// Headings are joined to the body with a period so the parser's title
/// stops at the heading. Nested matches are skipped; the outer one wins.
pub fn html_to_blocks(html: &str, container: &Selector) -> String {
    let document = Html::parse_document(html);
    let matched: Vec<ElementRef<'_>> = document.select(container).collect();

    matched
        .iter()
        .filter(|el| {
            !el.ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| matched.iter().any(|m| m.id() == a.id()))
        })
        .map(|el| {
            let mut raw = String::new();
            push_text(*el, &mut raw);
            collapse_whitespace(&raw)
        })
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn push_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if SKIPPED.contains(&name) {
                continue;
            }
            if HEADINGS.contains(&name) {
                let mut raw = String::new();
                push_text(child_el, &mut raw);
                let heading = collapse_whitespace(&raw);
                if !heading.is_empty() {
                    out.push(' ');
                    out.push_str(&heading);
                    if !heading.ends_with(['.', '!', '?', ':']) {
                        out.push('.');
                    }
                    out.push(' ');
                }
            } else if BREAKS.contains(&name) {
                out.push(' ');
                push_text(child_el, out);
                out.push(' ');
            } else {
                push_text(child_el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
