// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod agent;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::agent::{ContentAgent, DynAgent, RunResult, SourcingAgent, StoredContent};
pub use crate::api::{router, AppState};
pub use crate::config::AgentConfig;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "content_sourcing_dashboard=info,warn";

/// Install a tracing subscriber: `RUST_LOG`-style filter (default above),
/// JSON lines when `LOG_FORMAT=json`, compact text otherwise.
///
/// Uses `try_init`, so it is a no-op when the host runtime already installed one.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

/// Build the dashboard router from `.env` + environment + optional config file.
pub fn app() -> anyhow::Result<axum::Router> {
    let cfg = AgentConfig::load()?;
    let issues = cfg.validate_config();
    if !issues.is_empty() {
        tracing::warn!(issues = ?issues, "configuration issues");
    }
    Ok(router(AppState::from_config(cfg)))
}
