// src/publish/mod.rs
//! Where a selected announcement ends up. Text generation happens upstream;
//! publishers format the announcement as-is.

pub mod discord;

use anyhow::Result;
use tracing::info;

use crate::announcement::{content_fingerprint, Announcement};

pub use discord::DiscordWebhookPublisher;

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, announcement: &Announcement) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Logs the post instead of sending it anywhere (dry runs, local dev).
#[derive(Debug, Clone, Default)]
pub struct LogPublisher;

#[async_trait::async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, a: &Announcement) -> Result<()> {
        info!(
            target: "announcements",
            id = %a.id,
            date = %a.date,
            source = ?a.source,
            fingerprint = %content_fingerprint(&a.content),
            "would publish announcement"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
