// src/agent/mod.rs
pub mod analyze;
pub mod fetch;
pub mod llm;
pub mod pipeline;
pub mod store;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use pipeline::SourcingAgent;
pub use types::{
    Analysis, AnalyzedBy, ContentMetadata, ProcessedContent, RawContent, RawKind, RunResult,
    StoredContent,
};

/// The collaborator the dashboard drives. The dashboard never looks inside.
#[async_trait]
pub trait ContentAgent: Send + Sync {
    /// Fetch, process and store content for `query` from `sources`.
    async fn run(&self, query: &str, sources: &[String]) -> Result<RunResult>;
    /// Everything stored so far, across runs.
    async fn get_all_stored_content(&self) -> Vec<StoredContent>;
    fn name(&self) -> &'static str;
}

pub type DynAgent = Arc<dyn ContentAgent>;
