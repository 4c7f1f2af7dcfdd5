// src/manager.rs
//! Announcement lifecycle: refresh on a cooldown, select eligible items,
//! record posted status durably.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::announcement::{content_fingerprint, Announcement, StatusRecord};
use crate::cache::{read_json, write_json, CacheStore};
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::fetch::ContentFetcher;
use crate::metrics::ensure_metrics_described;
use crate::parser::AnnouncementParser;
use crate::refresh::RefreshGate;
use crate::selection::{pick_random, AgeWindow};
use crate::store::{AnnouncementStore, RebuildStats};

/// Handle shared by the posting loop and the HTTP surface.
pub type SharedManager = Arc<Mutex<AnnouncementManager>>;

pub struct AnnouncementManager {
    window: AgeWindow,
    status_key: String,
    parser: AnnouncementParser,
    fetcher: Arc<dyn ContentFetcher>,
    cache: Arc<dyn CacheStore>,
    store: AnnouncementStore,
    gate: RefreshGate,
    rng: StdRng,
    /// Set once the status cache has been read successfully.
    status_loaded: bool,
}

impl AnnouncementManager {
    /// Empty store; nothing is fetched until the first refresh.
    pub fn new(
        config: &TrackerConfig,
        fetcher: Arc<dyn ContentFetcher>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self::with_rng(config, fetcher, cache, StdRng::from_os_rng())
    }

    pub fn with_rng(
        config: &TrackerConfig,
        fetcher: Arc<dyn ContentFetcher>,
        cache: Arc<dyn CacheStore>,
        rng: StdRng,
    ) -> Self {
        ensure_metrics_described();
        Self {
            window: config.age_window(),
            status_key: config.status_key.clone(),
            parser: AnnouncementParser::new(config.platform_keyword.clone()),
            fetcher,
            cache,
            store: AnnouncementStore::new(),
            gate: RefreshGate::from_millis(config.refresh_interval_ms),
            rng,
            status_loaded: false,
        }
    }

    pub fn into_shared(self) -> SharedManager {
        Arc::new(Mutex::new(self))
    }

    pub fn window(&self) -> AgeWindow {
        self.window
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.gate.last_refreshed()
    }

    /// Always rebuild from the fetchers.
    ///
    /// A fetch failure leaves the store and the refresh timestamp untouched,
    /// so the next call retries.
    pub async fn force_refresh(&mut self, now: DateTime<Utc>) -> Result<RebuildStats> {
        let raw = match self.fetcher.fetch_text().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(target: "announcements", error = ?e, fetcher = self.fetcher.name(), "refresh aborted");
                counter!("announcements_refresh_errors_total").increment(1);
                return Err(TrackerError::Fetch(e));
            }
        };

        let fresh = self.parser.parse(&raw, now);
        counter!("announcements_parsed_total").increment(fresh.len() as u64);

        let persisted = match self.read_status().await {
            Ok(records) => records,
            Err(e) => {
                warn!(target: "announcements", error = %e, "ignoring cached posted status");
                Vec::new()
            }
        };
        let stats = self.store.rebuild(fresh, persisted);
        self.store.prune_ledger(&self.window, now);
        self.gate.record_refresh(now);

        counter!("announcements_refresh_total").increment(1);
        gauge!("announcements_known").set(stats.kept as f64);
        gauge!("announcements_last_refresh_ts").set(now.timestamp() as f64);
        info!(
            target: "announcements",
            parsed = stats.parsed,
            kept = stats.kept,
            duplicates = stats.duplicates,
            already_posted = stats.carried_posted,
            "announcements refreshed"
        );
        Ok(stats)
    }

    /// Rebuild only when the refresh interval has elapsed (or never ran).
    /// Returns whether a rebuild happened.
    pub async fn refresh_if_due(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if !self.gate.is_due(now) {
            return Ok(false);
        }
        self.force_refresh(now).await?;
        Ok(true)
    }

    /// One eligible announcement picked uniformly at random, or `None`.
    pub async fn random_unposted(&mut self, now: DateTime<Utc>) -> Result<Option<Announcement>> {
        self.refresh_if_due(now).await?;

        let mut eligible = self.window.eligible(self.store.values(), now);
        // map order is arbitrary; sort so a seeded rng gives repeatable picks
        eligible.sort_by(|a, b| a.id.cmp(&b.id));
        gauge!("announcements_eligible").set(eligible.len() as f64);

        let picked = pick_random(&eligible, &mut self.rng).map(|a| (*a).clone());
        match &picked {
            Some(a) => debug!(
                target: "announcements",
                id = %a.id,
                fingerprint = %content_fingerprint(&a.content),
                candidates = eligible.len(),
                "picked announcement"
            ),
            None => debug!(target: "announcements", "no eligible announcement"),
        }
        Ok(picked)
    }

    /// Every eligible announcement, oldest first.
    pub async fn all_unposted(&mut self, now: DateTime<Utc>) -> Result<Vec<Announcement>> {
        self.refresh_if_due(now).await?;
        let mut out: Vec<Announcement> = self
            .window
            .eligible(self.store.values(), now)
            .into_iter()
            .cloned()
            .collect();
        out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        gauge!("announcements_eligible").set(out.len() as f64);
        Ok(out)
    }

    /// All known announcements, newest date first.
    pub async fn announcements(&mut self, now: DateTime<Utc>) -> Result<Vec<Announcement>> {
        self.refresh_if_due(now).await?;
        Ok(self.store.newest_first())
    }

    /// Record `id` as posted and persist the whole status set.
    ///
    /// Unknown ids are still persisted. A failed write is returned to the
    /// caller; the in-memory flag stays set either way. When the status cache
    /// has never been read, it is read first; if that read fails nothing is
    /// written, since the write would replace records this process never saw.
    pub async fn mark_posted(&mut self, id: &str, now: DateTime<Utc>) -> Result<()> {
        if !self.status_loaded {
            match self.read_status().await {
                Ok(persisted) => self.store.seed_ledger(persisted),
                Err(e) => {
                    self.store.mark_posted(id, now);
                    warn!(target: "announcements", error = %e, id, "posted status not persisted; cache unreadable");
                    return Err(e);
                }
            }
        }

        let live = self.store.get(id).is_some();
        self.store.mark_posted(id, now);
        let pruned = self.store.prune_ledger(&self.window, now);
        let snapshot = self.store.snapshot();
        counter!("announcements_marked_posted_total").increment(1);

        if let Err(e) = write_json(self.cache.as_ref(), &self.status_key, &snapshot).await {
            warn!(target: "announcements", error = %e, id, "posted status not persisted");
            counter!("announcements_persist_errors_total").increment(1);
            return Err(e);
        }
        info!(target: "announcements", id, live, records = snapshot.len(), pruned, "marked posted");
        Ok(())
    }

    /// Status records from the cache. A payload of the wrong shape counts as
    /// empty (the next write replaces it); a failed read is returned.
    async fn read_status(&mut self) -> Result<Vec<StatusRecord>> {
        match read_json::<Vec<StatusRecord>>(self.cache.as_ref(), &self.status_key).await {
            Ok(records) => {
                self.status_loaded = true;
                Ok(records.unwrap_or_default())
            }
            Err(e @ TrackerError::MalformedRecord { .. }) => {
                warn!(target: "announcements", error = %e, "cached posted status is malformed; starting from empty");
                counter!("announcements_persist_errors_total").increment(1);
                self.status_loaded = true;
                Ok(Vec::new())
            }
            Err(e) => {
                counter!("announcements_persist_errors_total").increment(1);
                Err(e)
            }
        }
    }
}
