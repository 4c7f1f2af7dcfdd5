use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "announcements_refresh_total",
            "Successful rebuilds of the announcement store."
        );
        describe_counter!(
            "announcements_refresh_errors_total",
            "Rebuilds aborted by a fetcher failure."
        );
        describe_counter!(
            "announcements_parsed_total",
            "Announcement candidates produced by the parser."
        );
        describe_counter!(
            "announcements_marked_posted_total",
            "Mark-as-posted calls."
        );
        describe_counter!(
            "announcements_persist_errors_total",
            "Status cache reads or writes that failed."
        );
        describe_gauge!("announcements_known", "Announcements in the live store.");
        describe_gauge!(
            "announcements_eligible",
            "Eligible announcements at the last selection."
        );
        describe_gauge!(
            "announcements_last_refresh_ts",
            "Unix ts of the last successful rebuild."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
