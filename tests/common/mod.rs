// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use announcement_tracker::{
    cache::{CacheStore, MemoryCache},
    fetch::ContentFetcher,
    publish::Publisher,
    Announcement, AnnouncementManager, TrackerConfig,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};
use serde_json::Value;

pub const RAW: &str = "2024-01-01: Mainnet launched.\n\nSome website blurb about staking.";
pub const MAINNET_ID: &str = "2024-01-01-20240101Mainnetlaunched";

/// 2024-01-03 12:00 UTC
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap()
}

/// Fetcher whose text and failure mode can change between calls.
#[derive(Default)]
pub struct ScriptedFetcher {
    text: Mutex<String>,
    fail: Mutex<bool>,
    calls: Mutex<usize>,
}

impl ScriptedFetcher {
    pub fn new(text: &str) -> Arc<Self> {
        let f = Self::default();
        *f.text.lock() = text.to_string();
        Arc::new(f)
    }
    pub fn set_text(&self, text: &str) {
        *self.text.lock() = text.to_string();
    }
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    async fn fetch_text(&self) -> Result<String> {
        *self.calls.lock() += 1;
        if *self.fail.lock() {
            anyhow::bail!("upstream unavailable");
        }
        Ok(self.text.lock().clone())
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Wraps a MemoryCache and can be told to fail reads or writes.
#[derive(Default)]
pub struct FlakyCache {
    pub inner: MemoryCache,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
    writes: Mutex<usize>,
}

impl FlakyCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
    pub fn set_fail_reads(&self, v: bool) {
        *self.fail_reads.lock() = v;
    }
    pub fn set_fail_writes(&self, v: bool) {
        *self.fail_writes.lock() = v;
    }
    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }
}

#[async_trait]
impl CacheStore for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        if *self.fail_reads.lock() {
            anyhow::bail!("cache read timeout");
        }
        self.inner.get(key).await
    }
    async fn set(&self, key: &str, value: Value) -> Result<()> {
        if *self.fail_writes.lock() {
            anyhow::bail!("cache write refused");
        }
        *self.writes.lock() += 1;
        self.inner.set(key, value).await
    }
    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

/// Records what would have been published.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
    pub fn set_failing(&self, v: bool) {
        *self.fail.lock() = v;
    }
    pub fn ids(&self) -> Vec<String> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, a: &Announcement) -> Result<()> {
        if *self.fail.lock() {
            anyhow::bail!("rate limited");
        }
        self.published.lock().push(a.id.clone());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

pub fn manager(fetcher: Arc<ScriptedFetcher>, cache: Arc<FlakyCache>) -> AnnouncementManager {
    AnnouncementManager::with_rng(
        &TrackerConfig::default(),
        fetcher,
        cache,
        StdRng::seed_from_u64(42),
    )
}
