use anyhow::{anyhow, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process; later calls reuse it.
    pub fn init() -> Result<Self> {
        let handle = HANDLE.get_or_try_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| anyhow!("prometheus: install recorder: {e}"))
        })?;
        ensure_metrics_described();
        Ok(Self {
            handle: handle.clone(),
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
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

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sourcing_runs_total", "Agent runs started.");
        describe_counter!("sourcing_run_failures_total", "Agent runs that returned an error.");
        describe_counter!("sourcing_fetch_errors_total", "Source fetch/parse errors.");
        describe_counter!("sourcing_items_fetched_total", "Raw content items fetched.");
        describe_counter!("sourcing_items_stored_total", "Content items newly stored.");
        describe_counter!(
            "sourcing_llm_fallbacks_total",
            "LLM analyses that fell back to heuristics."
        );
        describe_histogram!("sourcing_run_ms", "Agent run time in milliseconds.");
    });
}
