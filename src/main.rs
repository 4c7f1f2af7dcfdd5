//! Announcement tracker binary entrypoint.
//! Wires fetchers, the status cache and the manager, then runs the posting
//! loop next to the debug HTTP surface.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use announcement_tracker::{
    api,
    cache::FileCache,
    config::AppConfig,
    fetch::{CombinedFetcher, ContentFetcher, SocialFeedFetcher, WebsiteFetcher},
    metrics::Metrics,
    publish::{DiscordWebhookPublisher, LogPublisher, Publisher},
    AnnouncementManager, PostingOrchestrator,
};
use chrono::Utc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `LOG_FORMAT=json` switches to JSON lines; otherwise compact text.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("announcements=info,announcement_tracker=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn build_fetcher(cfg: &AppConfig) -> Result<CombinedFetcher> {
    let mut fetchers: Vec<Box<dyn ContentFetcher>> = Vec::new();
    if let Some(url) = &cfg.sources.social_feed_url {
        fetchers.push(Box::new(SocialFeedFetcher::from_url(
            cfg.sources.social_label.clone(),
            url.clone(),
        )));
    }
    if let Some(url) = &cfg.sources.website_url {
        fetchers.push(Box::new(
            WebsiteFetcher::from_url(url.clone()).with_container(&cfg.sources.website_container)?,
        ));
    }
    Ok(CombinedFetcher::new(fetchers))
}

fn build_publisher(cfg: &AppConfig) -> Arc<dyn Publisher> {
    match &cfg.service.discord_webhook_url {
        Some(url) => Arc::new(DiscordWebhookPublisher::new(url.clone())),
        None => Arc::new(LogPublisher),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let once = std::env::args().any(|a| a == "--once");
    let cfg = AppConfig::load_default()?;

    // Install the recorder before anything registers series.
    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!("metrics disabled: {e:#}");
            None
        }
    };

    let fetcher = build_fetcher(&cfg)?;
    if fetcher.is_empty() {
        tracing::warn!("no sources configured; set sources.social_feed_url or sources.website_url");
    }
    let cache = FileCache::new(cfg.service.state_dir.clone());
    let manager =
        AnnouncementManager::new(&cfg.tracker, Arc::new(fetcher), Arc::new(cache)).into_shared();

    // Initial rebuild; a failure here only means the first cycle refetches.
    if let Err(e) = manager.lock().await.force_refresh(Utc::now()).await {
        tracing::error!("initial refresh failed: {e:#}");
    }

    let orchestrator = PostingOrchestrator::new(manager.clone(), build_publisher(&cfg));

    if once {
        let outcome = orchestrator.post_next(Utc::now()).await?;
        println!("{outcome:?}");
        return Ok(());
    }

    let posting = orchestrator.spawn(Duration::from_secs(cfg.service.post_interval_secs.max(1)));

    let mut app = api::router(manager);
    if let Some(m) = &metrics {
        app = app.merge(m.router());
    }

    let listener = tokio::net::TcpListener::bind(&cfg.service.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.service.bind_addr))?;
    tracing::info!(addr = %cfg.service.bind_addr, "serving announcement API");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    posting.abort();
    served.context("http server")
}
