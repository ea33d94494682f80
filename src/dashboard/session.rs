//! Per-dashboard session state: the agent handle and the last run's cached output.

use std::sync::Arc;

use anyhow::Result;
use metrics::counter;
use tracing::{error, info};

use crate::agent::{DynAgent, RunResult, StoredContent};

/// Builds the agent on first use. Boxed so the router can be tested with stub agents.
pub type AgentFactory = Arc<dyn Fn() -> Result<DynAgent> + Send + Sync>;

pub const RUN_SUCCESS_MESSAGE: &str = "Content sourcing completed!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(String),
    /// No agent available (initialization failed).
    Skipped,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

#[derive(Default)]
pub struct DashboardSession {
    agent: Option<DynAgent>,
    init_error: Option<String>,
    initialized: bool,
    pub results: Option<RunResult>,
    pub stored_content: Vec<StoredContent>,
    pub last_query: String,
    pub last_sources_input: String,
}

impl DashboardSession {
    pub fn new(query: impl Into<String>, sources_input: impl Into<String>) -> Self {
        Self {
            last_query: query.into(),
            last_sources_input: sources_input.into(),
            ..Default::default()
        }
    }

    /// Build the agent once. A failure is remembered and the agent stays absent.
    pub fn initialize(&mut self, factory: &AgentFactory) -> Option<DynAgent> {
        if !self.initialized {
            self.initialized = true;
            self.results = None;
            self.stored_content.clear();
            match factory() {
                Ok(agent) => {
                    info!(agent = agent.name(), "agent ready");
                    self.agent = Some(agent);
                }
                Err(e) => {
                    error!(error = %e, "agent initialization failed");
                    self.init_error =
                        Some(format!("Failed to initialize ContentSourcingAgent: {e:#}"));
                    self.agent = None;
                }
            }
        }
        self.agent.clone()
    }

    pub fn agent(&self) -> Option<DynAgent> {
        self.agent.clone()
    }

    pub fn init_error(&self) -> Option<&str> {
        self.init_error.as_deref()
    }

    /// Record a finished run. Failures reset the cached output.
    pub fn apply_run(&mut self, outcome: Result<(RunResult, Vec<StoredContent>)>) -> RunOutcome {
        match outcome {
            Ok((result, stored)) => {
                self.results = Some(result);
                self.stored_content = stored;
                RunOutcome::Completed
            }
            Err(e) => {
                self.results = None;
                self.stored_content.clear();
                RunOutcome::Failed(format!("Error running agent: {e:#}"))
            }
        }
    }

    /// Initialize if needed, run the agent and record the outcome.
    pub async fn run(
        &mut self,
        factory: &AgentFactory,
        query: &str,
        sources_input: &str,
    ) -> RunOutcome {
        self.last_query = query.to_string();
        self.last_sources_input = sources_input.to_string();
        let Some(agent) = self.initialize(factory) else {
            return RunOutcome::Skipped;
        };
        let sources = parse_sources(sources_input);
        let outcome = execute_run(&agent, query, &sources).await;
        self.apply_run(outcome)
    }
}

/// One agent call plus the follow-up read of everything stored.
pub async fn execute_run(
    agent: &DynAgent,
    query: &str,
    sources: &[String],
) -> Result<(RunResult, Vec<StoredContent>)> {
    match agent.run(query, sources).await {
        Ok(result) => {
            let stored = agent.get_all_stored_content().await;
            Ok((result, stored))
        }
        Err(e) => {
            counter!("sourcing_run_failures_total").increment(1);
            error!(error = %e, agent = agent.name(), "agent run failed");
            Err(e)
        }
    }
}

/// Comma-separated input → trimmed, non-empty URLs.
pub fn parse_sources(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
