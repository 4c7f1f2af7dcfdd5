// src/orchestrator.rs
//! Posting loop: pick one announcement, publish it, report it posted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time;

use crate::manager::SharedManager;
use crate::publish::Publisher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Posted(String),
    NothingEligible,
    /// Selection failed (usually a fetch error); try again next cycle.
    Unavailable,
}

#[derive(Clone)]
pub struct PostingOrchestrator {
    manager: SharedManager,
    publisher: Arc<dyn Publisher>,
}

impl PostingOrchestrator {
    pub fn new(manager: SharedManager, publisher: Arc<dyn Publisher>) -> Self {
        Self { manager, publisher }
    }

    /// One posting cycle.
    ///
    /// A publish failure leaves the announcement unposted. A failed status
    /// write is returned, since ignoring it risks posting the same item again.
    pub async fn post_next(&self, now: DateTime<Utc>) -> Result<PostOutcome> {
        let picked = { self.manager.lock().await.random_unposted(now).await };
        let announcement = match picked {
            Ok(Some(a)) => a,
            Ok(None) => {
                tracing::debug!(target: "announcements", "nothing to post this cycle");
                return Ok(PostOutcome::NothingEligible);
            }
            Err(e) => {
                tracing::warn!(target: "announcements", error = %e, "no announcement available this cycle");
                return Ok(PostOutcome::Unavailable);
            }
        };

        self.publisher
            .publish(&announcement)
            .await
            .with_context(|| format!("publishing {} via {}", announcement.id, self.publisher.name()))?;

        self.manager
            .lock()
            .await
            .mark_posted(&announcement.id, now)
            .await
            .with_context(|| format!("recording {} as posted", announcement.id))?;

        Ok(PostOutcome::Posted(announcement.id))
    }

    /// Catch-up sweep: publish and mark every eligible announcement.
    /// Stops at the first failure; ids already handled stay posted.
    pub async fn post_all(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let pending = { self.manager.lock().await.all_unposted(now).await? };
        let mut done = Vec::with_capacity(pending.len());
        for a in pending {
            self.publisher
                .publish(&a)
                .await
                .with_context(|| format!("publishing {} via {}", a.id, self.publisher.name()))?;
            self.manager
                .lock()
                .await
                .mark_posted(&a.id, now)
                .await
                .with_context(|| format!("recording {} as posted", a.id))?;
            done.push(a.id);
        }
        tracing::info!(target: "announcements", posted = done.len(), "catch-up sweep finished");
        Ok(done)
    }

    /// Run `post_next` every `every`. Abort the handle to stop.
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(every);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.post_next(Utc::now()).await {
                    Ok(PostOutcome::Posted(id)) => {
                        tracing::info!(target: "announcements", %id, "posted announcement")
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(target: "announcements", "posting tick failed: {e:#}"),
                }
            }
        })
    }
}
