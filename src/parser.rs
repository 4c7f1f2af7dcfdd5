// src/parser.rs
//! Splits a raw announcement blob into discrete candidates.
//!
//! Segments are separated by a blank line. Each segment gets a best-effort
//! date, a source guess, a title and a deterministic id so the same text
//! re-parsed later maps onto the same status entry.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::announcement::{start_of_day, Announcement, Source};

/// Characters of the trimmed segment that feed the id snippet.
pub const ID_SNIPPET_CHARS: usize = 32;

#[derive(Debug, Clone)]
pub struct AnnouncementParser {
    platform_keyword: String,
}

impl AnnouncementParser {
    pub fn new(platform_keyword: impl Into<String>) -> Self {
        Self {
            platform_keyword: platform_keyword.into().to_lowercase(),
        }
    }

    pub fn platform_keyword(&self) -> &str {
        &self.platform_keyword
    }

    /// Parse `raw` as of `now`. Pure: no I/O, no clock reads.
    pub fn parse(&self, raw: &str, now: DateTime<Utc>) -> Vec<Announcement> {
        let today = now.date_naive();
        split_segments(raw)
            .map(|segment| self.parse_segment(segment, today, now))
            .collect()
    }

    fn parse_segment(&self, segment: &str, today: NaiveDate, now: DateTime<Utc>) -> Announcement {
        let date = find_date(segment).unwrap_or(today);
        let source = if !self.platform_keyword.is_empty()
            && segment.to_lowercase().contains(&self.platform_keyword)
        {
            Source::Social
        } else {
            Source::Website
        };

        Announcement {
            id: announcement_id(date, segment),
            content: segment.to_string(),
            source,
            date,
            timestamp: start_of_day(date),
            discovered_at: now,
            title: extract_title(segment),
            posted: false,
            last_posted: None,
        }
    }
}

/// Non-empty, trimmed segments separated by a blank line.
fn split_segments(raw: &str) -> impl Iterator<Item = &str> {
    static RE_BLANK: OnceCell<Regex> = OnceCell::new();
    // Tolerate CRLF input and whitespace-only separator lines.
    let re = RE_BLANK.get_or_init(|| Regex::new(r"\r?\n[ \t]*\r?\n").unwrap());
    re.split(raw).map(str::trim).filter(|s| !s.is_empty())
}

/// First `YYYY-MM-DD` substring that is also a real calendar date.
pub fn find_date(text: &str) -> Option<NaiveDate> {
    static RE_DATE: OnceCell<Regex> = OnceCell::new();
    let re = RE_DATE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());
    re.find_iter(text)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
}

/// `"{date}-{snippet}"`, snippet = ASCII alphanumerics of the first 32 chars.
pub fn announcement_id(date: NaiveDate, segment: &str) -> String {
    let snippet: String = segment
        .trim()
        .chars()
        .take(ID_SNIPPET_CHARS)
        .filter(char::is_ascii_alphanumeric)
        .collect();
    format!("{}-{}", date.format("%Y-%m-%d"), snippet)
}

/// Text before the first `.` or `:`; the whole segment when neither occurs.
pub fn extract_title(segment: &str) -> Option<String> {
    let head = segment
        .split(['.', ':'])
        .next()
        .unwrap_or_default()
        .trim();
    if head.is_empty() {
        None
    } else {
        Some(head.to_string())
    }
}
