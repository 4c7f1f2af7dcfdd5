use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Publisher;
use crate::announcement::{Announcement, Source};

/// Discord caps embed descriptions at 4096 characters.
const MAX_DESCRIPTION_CHARS: usize = 4000;
const MAX_RETRIES: u8 = 8;

/// 500ms, doubling per attempt, capped at 32s.
fn backoff(attempt: u8) -> Duration {
    let exp = u32::from(attempt.saturating_sub(1)).min(6);
    Duration::from_millis(500u64 << exp)
}

#[derive(Clone)]
pub struct DiscordWebhookPublisher {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordWebhookPublisher {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.clamp(1, MAX_RETRIES);
        self
    }

    async fn send(&self, payload: &DiscordWebhookPayload) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Discord webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Discord webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(target: "announcements", attempt, error = %err, "discord retry");
            tokio::time::sleep(backoff(attempt)).await;
        }
    }
}

#[async_trait::async_trait]
impl Publisher for DiscordWebhookPublisher {
    async fn publish(&self, a: &Announcement) -> Result<()> {
        self.send(&DiscordWebhookPayload::for_announcement(a)).await
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    footer: DiscordFooter,
}

#[derive(Debug, Serialize)]
struct DiscordFooter {
    text: String,
}

#[derive(Debug, Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn for_announcement(a: &Announcement) -> Self {
        let title = a
            .title
            .clone()
            .unwrap_or_else(|| "Announcement".to_string());
        let description: String = a.content.chars().take(MAX_DESCRIPTION_CHARS).collect();
        let origin = match a.source {
            Source::Social => "social",
            Source::Website => "website",
        };
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: title.chars().take(256).collect(),
                description,
                footer: DiscordFooter {
                    text: format!("{} · {} · {}", a.date, origin, a.id),
                },
            }],
        }
    }
}
