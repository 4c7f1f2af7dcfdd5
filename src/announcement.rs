// src/announcement.rs
//! Announcement data model and the persisted status record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where an announcement most likely came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Social,
    Website,
}

/// One discovered unit of news.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub content: String,
    pub source: Source,
    /// Best-effort calendar date; parse day when the text carries none.
    pub date: NaiveDate,
    /// Start of `date` (UTC). Age checks use this, not `discovered_at`.
    pub timestamp: DateTime<Utc>,
    pub discovered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub posted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_posted: Option<DateTime<Utc>>,
}

impl Announcement {
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.timestamp).num_milliseconds() as f64 / 3_600_000.0
    }

    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        self.age_hours(now) / 24.0
    }

    /// Flip to posted. Never flips back.
    pub fn mark_posted(&mut self, now: DateTime<Utc>) {
        self.posted = true;
        self.last_posted = Some(now);
    }
}

/// Start of `date` in UTC.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Posted-status entry as written to the persistence gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub id: String,
    #[serde(default)]
    pub posted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_posted: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

impl StatusRecord {
    /// Record for an id that is not in the live map (e.g. rebuilt since selection).
    pub fn posted_now(id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            posted: true,
            last_posted: Some(now),
            date: date_from_id(id),
            title: None,
            source: None,
        }
    }

    /// Fold `older` into `self`, keeping `self` as the authoritative side.
    /// `posted` only ever moves to true.
    pub fn absorb(&mut self, older: &StatusRecord) {
        self.posted |= older.posted;
        if self.last_posted.is_none() {
            self.last_posted = older.last_posted;
        }
        if self.date.is_none() {
            self.date = older.date;
        }
        if self.title.is_none() {
            self.title = older.title.clone();
        }
        if self.source.is_none() {
            self.source = older.source;
        }
    }
}

impl From<&Announcement> for StatusRecord {
    fn from(a: &Announcement) -> Self {
        Self {
            id: a.id.clone(),
            posted: a.posted,
            last_posted: a.last_posted,
            date: Some(a.date),
            title: a.title.clone(),
            source: Some(a.source),
        }
    }
}

/// Ids start with `YYYY-MM-DD`; recover it when possible.
pub fn date_from_id(id: &str) -> Option<NaiveDate> {
    let prefix = id.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Short SHA-256 fingerprint for logging content without logging the content.
pub fn content_fingerprint(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
