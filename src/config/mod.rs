// src/config/mod.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::selection::{AgeWindow, DEFAULT_MAX_AGE_DAYS, DEFAULT_MIN_AGE_HOURS};

// --- env names & defaults ---
pub const ENV_CONFIG_PATH: &str = "ANNOUNCEMENTS_CONFIG_PATH";
pub const ENV_MIN_AGE_HOURS: &str = "ANNOUNCEMENTS_MIN_AGE_HOURS";
pub const ENV_MAX_AGE_DAYS: &str = "ANNOUNCEMENTS_MAX_AGE_DAYS";
pub const ENV_REFRESH_INTERVAL_MS: &str = "ANNOUNCEMENTS_REFRESH_INTERVAL_MS";
pub const ENV_DISCORD_WEBHOOK: &str = "DISCORD_WEBHOOK_URL";

pub const DEFAULT_CONFIG_PATH: &str = "config/announcements.toml";
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30 * 60 * 1000;
pub const DEFAULT_STATUS_KEY: &str = "announcements/posted_status";

fn default_min_age_hours() -> f64 {
    DEFAULT_MIN_AGE_HOURS
}
fn default_max_age_days() -> f64 {
    DEFAULT_MAX_AGE_DAYS
}
fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}
fn default_platform_keyword() -> String {
    "twitter".to_string()
}
fn default_status_key() -> String {
    DEFAULT_STATUS_KEY.to_string()
}
fn default_social_label() -> String {
    "Twitter @MANTRA_Chain".to_string()
}
fn default_website_container() -> String {
    crate::fetch::website::DEFAULT_CONTAINER.to_string()
}
fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}
fn default_post_interval_secs() -> u64 {
    3600
}

/// Lifecycle knobs: age window, refresh cadence, classification, cache key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    #[serde(default = "default_min_age_hours")]
    pub min_announcement_age_hours: f64,
    #[serde(default = "default_max_age_days")]
    pub max_announcement_age_days: f64,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Lowercased and matched against each segment to tag it as social.
    #[serde(default = "default_platform_keyword")]
    pub platform_keyword: String,
    #[serde(default = "default_status_key")]
    pub status_key: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_announcement_age_hours: default_min_age_hours(),
            max_announcement_age_days: default_max_age_days(),
            refresh_interval_ms: default_refresh_interval_ms(),
            platform_keyword: default_platform_keyword(),
            status_key: default_status_key(),
        }
    }
}

impl TrackerConfig {
    pub fn age_window(&self) -> AgeWindow {
        AgeWindow::new(self.min_announcement_age_hours, self.max_announcement_age_days)
    }

    /// Replace out-of-range values with defaults.
    pub fn sanitize(&mut self) {
        if !self.min_announcement_age_hours.is_finite() || self.min_announcement_age_hours < 0.0 {
            self.min_announcement_age_hours = default_min_age_hours();
        }
        if !self.max_announcement_age_days.is_finite() || self.max_announcement_age_days < 0.0 {
            self.max_announcement_age_days = default_max_age_days();
        }
        if self.status_key.trim().is_empty() {
            self.status_key = default_status_key();
        }
        self.platform_keyword = self.platform_keyword.trim().to_lowercase();
    }

    /// Apply `ANNOUNCEMENTS_*` overrides; unparsable values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(v) = parse_env::<f64>(ENV_MIN_AGE_HOURS) {
            self.min_announcement_age_hours = v;
        }
        if let Some(v) = parse_env::<f64>(ENV_MAX_AGE_DAYS) {
            self.max_announcement_age_days = v;
        }
        if let Some(v) = parse_env::<u64>(ENV_REFRESH_INTERVAL_MS) {
            self.refresh_interval_ms = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourcesConfig {
    /// Prefix for social blocks; must contain the platform keyword.
    #[serde(default = "default_social_label")]
    pub social_label: String,
    #[serde(default)]
    pub social_feed_url: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    /// CSS selector for one announcement on the website page.
    #[serde(default = "default_website_container")]
    pub website_container: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            social_label: default_social_label(),
            social_feed_url: None,
            website_url: None,
            website_container: default_website_container(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_post_interval_secs")]
    pub post_interval_secs: u64,
    #[serde(default)]
    pub discord_webhook_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            state_dir: default_state_dir(),
            post_interval_secs: default_post_interval_secs(),
            discord_webhook_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing announcements config")?;
        cfg.finish();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks:
    /// 1) $ANNOUNCEMENTS_CONFIG_PATH (must exist)
    /// 2) config/announcements.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        let mut cfg = AppConfig::default();
        cfg.finish();
        Ok(cfg)
    }

    fn finish(&mut self) {
        self.tracker.apply_env();
        self.tracker.sanitize();
        if self.service.discord_webhook_url.is_none() {
            self.service.discord_webhook_url = std::env::var(ENV_DISCORD_WEBHOOK)
                .ok()
                .filter(|v| !v.trim().is_empty());
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}
