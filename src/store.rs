// src/store.rs
//! In-memory announcement map plus the status ledger that gets persisted.
//!
//! The map is replaced wholesale on every rebuild. The ledger accumulates every
//! status record this process knows about (loaded from the cache, or written by
//! mark-as-posted), so ids that drop out of the feed keep their status too.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::announcement::{Announcement, StatusRecord};
use crate::selection::AgeWindow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub parsed: usize,
    pub kept: usize,
    /// Candidates overwritten by a later one with the same id.
    pub duplicates: usize,
    /// Kept announcements that came back already posted.
    pub carried_posted: usize,
}

#[derive(Debug, Default)]
pub struct AnnouncementStore {
    items: HashMap<String, Announcement>,
    ledger: Option<BTreeMap<String, StatusRecord>>,
}

impl AnnouncementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Announcement> {
        self.items.get(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &Announcement> {
        self.items.values()
    }

    /// All announcements, newest date first (ties by id for a stable order).
    pub fn newest_first(&self) -> Vec<Announcement> {
        let mut out: Vec<Announcement> = self.items.values().cloned().collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Whether persisted status has been loaded into this process yet.
    pub fn has_ledger(&self) -> bool {
        self.ledger.is_some()
    }

    /// Merge records read from the cache. Cached fields win; `posted` never drops.
    pub fn seed_ledger(&mut self, persisted: Vec<StatusRecord>) {
        let ledger = self.ledger.get_or_insert_with(BTreeMap::new);
        for mut rec in persisted {
            if let Some(prior) = ledger.get(&rec.id) {
                rec.absorb(prior);
            }
            ledger.insert(rec.id.clone(), rec);
        }
    }

    /// Replace the live map with `fresh`, carrying posted status forward.
    ///
    /// Status comes from the cached record when one exists, otherwise from the
    /// previous live entry. Either way an id that was posted stays posted.
    /// The new map is built aside and swapped in, so readers never see it half-filled.
    pub fn rebuild(&mut self, fresh: Vec<Announcement>, persisted: Vec<StatusRecord>) -> RebuildStats {
        self.seed_ledger(persisted);
        let ledger = self.ledger.get_or_insert_with(BTreeMap::new);

        let mut stats = RebuildStats {
            parsed: fresh.len(),
            ..RebuildStats::default()
        };
        let mut next: HashMap<String, Announcement> = HashMap::with_capacity(fresh.len());

        for mut a in fresh {
            let prev = self.items.get(&a.id);
            if let Some(prev) = prev {
                a.discovered_at = prev.discovered_at;
            }

            match (ledger.get(&a.id), prev) {
                (Some(rec), _) => {
                    a.posted = rec.posted;
                    a.last_posted = rec.last_posted;
                }
                (None, Some(prev)) => {
                    a.posted = prev.posted;
                    a.last_posted = prev.last_posted;
                }
                (None, None) => {}
            }
            if let Some(prev) = prev {
                if prev.posted && !a.posted {
                    a.posted = true;
                    a.last_posted = a.last_posted.or(prev.last_posted);
                }
            }

            // last write wins within a batch
            if next.insert(a.id.clone(), a).is_some() {
                stats.duplicates += 1;
            }
        }

        stats.kept = next.len();
        stats.carried_posted = next.values().filter(|a| a.posted).count();
        self.items = next;
        stats
    }

    /// Mark `id` posted and return its ledger record.
    ///
    /// An id missing from the live map still gets a posted record, so a later
    /// rebuild that rediscovers it merges `posted = true`.
    pub fn mark_posted(&mut self, id: &str, now: DateTime<Utc>) -> StatusRecord {
        let mut marked = match self.items.get_mut(id) {
            Some(a) => {
                a.mark_posted(now);
                StatusRecord::from(&*a)
            }
            None => StatusRecord::posted_now(id, now),
        };

        let ledger = self.ledger.get_or_insert_with(BTreeMap::new);
        for a in self.items.values() {
            let mut rec = StatusRecord::from(a);
            if let Some(prior) = ledger.get(&rec.id) {
                rec.absorb(prior);
            }
            ledger.insert(rec.id.clone(), rec);
        }
        if let Some(prior) = ledger.get(id) {
            marked.absorb(prior);
        }
        ledger.insert(marked.id.clone(), marked.clone());
        marked
    }

    /// Drop ledger records dated past the window's upper bound.
    /// Records without a date are kept. Returns how many were dropped.
    pub fn prune_ledger(&mut self, window: &AgeWindow, now: DateTime<Utc>) -> usize {
        let Some(ledger) = self.ledger.as_mut() else {
            return 0;
        };
        let before = ledger.len();
        ledger.retain(|_, rec| !rec.date.is_some_and(|d| window.is_expired(d, now)));
        before - ledger.len()
    }

    /// Every known status record, ordered by id.
    pub fn snapshot(&self) -> Vec<StatusRecord> {
        self.ledger
            .as_ref()
            .map(|l| l.values().cloned().collect())
            .unwrap_or_default()
    }
}
