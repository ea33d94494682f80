//! Headless run: one agent call, summary printed to stdout.
//!
//! Usage: `sourcing_once [QUERY] [COMMA_SEPARATED_SOURCES]`
//! Missing arguments fall back to `TEST_QUERY` / `TEST_SOURCES` / configured static sources.

use std::sync::Arc;

use content_sourcing_dashboard::config::{default_query, default_sources_input, AgentConfig};
use content_sourcing_dashboard::dashboard::render::preview;
use content_sourcing_dashboard::dashboard::{
    AgentFactory, ConfigSummary, DashboardSession, OverviewSummary, RunOutcome,
};
use content_sourcing_dashboard::{init_tracing, DynAgent, SourcingAgent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AgentConfig::load()?;
    let mut args = std::env::args().skip(1);
    let query = args.next().unwrap_or_else(default_query);
    let sources_input = args.next().unwrap_or_else(|| default_sources_input(&cfg));

    let factory_cfg = cfg.clone();
    let factory: AgentFactory =
        Arc::new(move || Ok(Arc::new(SourcingAgent::from_config(&factory_cfg)?) as DynAgent));

    let mut session = DashboardSession::new(query.clone(), sources_input.clone());
    let outcome = session.run(&factory, &query, &sources_input).await;
    match &outcome {
        RunOutcome::Completed => println!("Content sourcing completed!"),
        RunOutcome::Failed(msg) => println!("{msg}"),
        RunOutcome::Skipped => {
            println!("{}", session.init_error().unwrap_or("agent unavailable"));
        }
    }

    println!("\nExecution Summary");
    let summary = OverviewSummary::from_result(session.results.as_ref());
    for (label, value) in summary.rows() {
        println!("  {label}: {value}");
    }
    for e in &summary.errors {
        println!("  ! {e}");
    }

    println!("\nAgent Configuration");
    let cfg_summary = ConfigSummary::from_config(&cfg);
    for (label, value) in cfg_summary.rows() {
        println!("  {label}: {value}");
    }
    for issue in &cfg_summary.issues {
        println!("  - {issue}");
    }

    println!("\nProcessed Content");
    for (i, item) in session.stored_content.iter().enumerate() {
        println!(
            "  {}. {} [{} | {:.2}] {}",
            i + 1,
            item.title,
            item.category,
            item.quality_score,
            item.source_url
        );
        println!("     {}", preview(&item.content));
    }

    if outcome.is_success() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
