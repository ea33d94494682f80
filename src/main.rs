//! Content Sourcing Dashboard: binary entrypoint
//! Boots the Axum HTTP server with the dashboard router and shared session state.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    content_sourcing_dashboard::init_tracing();

    let router = content_sourcing_dashboard::app()?;
    Ok(router.into())
}
