// src/refresh.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Cooldown gate for rebuilding the store from fetchers.
/// - Never refreshed: always due.
/// - Inside the interval: not due.
/// - State is updated explicitly via `record_refresh` after a successful rebuild.
#[derive(Debug, Clone)]
pub struct RefreshGate {
    interval: ChronoDuration,
    last_refreshed: Option<DateTime<Utc>>,
}

impl RefreshGate {
    pub fn new(interval: std::time::Duration) -> Self {
        let interval =
            ChronoDuration::from_std(interval).unwrap_or_else(|_| ChronoDuration::MAX);
        Self {
            interval,
            last_refreshed: None,
        }
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Self::new(std::time::Duration::from_millis(interval_ms))
    }

    /// Check if a rebuild should run at `now`. Does NOT mutate state.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_refreshed {
            None => true,
            Some(ts) => now.signed_duration_since(ts) >= self.interval,
        }
    }

    pub fn record_refresh(&mut self, now: DateTime<Utc>) {
        self.last_refreshed = Some(now);
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    pub fn interval(&self) -> ChronoDuration {
        self.interval
    }
}
