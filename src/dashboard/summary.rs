// src/dashboard/summary.rs
use serde::Serialize;

use crate::agent::RunResult;
use crate::config::AgentConfig;

pub const UNKNOWN: &str = "Unknown";

/// Counts shown under "Execution Summary".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverviewSummary {
    pub has_results: bool,
    pub query: String,
    pub sources_processed: usize,
    pub content_items_fetched: usize,
    pub content_items_processed: usize,
    pub content_items_stored: usize,
    pub errors_encountered: usize,
    pub errors: Vec<String>,
}

impl OverviewSummary {
    pub fn from_result(result: Option<&RunResult>) -> Self {
        let Some(r) = result else {
            return Self::default();
        };
        Self {
            has_results: true,
            query: if r.query.trim().is_empty() {
                UNKNOWN.to_string()
            } else {
                r.query.clone()
            },
            sources_processed: r.sources.len(),
            content_items_fetched: r.raw_content.len(),
            content_items_processed: r.processed_content.len(),
            content_items_stored: r.stored_content.len(),
            errors_encountered: r.errors.len(),
            errors: r.errors.clone(),
        }
    }

    /// Label/value rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Query", self.query.clone()),
            ("Sources Processed", self.sources_processed.to_string()),
            ("Content Items Fetched", self.content_items_fetched.to_string()),
            ("Content Items Processed", self.content_items_processed.to_string()),
            ("Content Items Stored", self.content_items_stored.to_string()),
            ("Errors Encountered", self.errors_encountered.to_string()),
        ]
    }
}

/// "Agent Configuration" block. Never carries the API key itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSummary {
    pub llm_model: String,
    pub quality_threshold: f32,
    pub max_sources: usize,
    pub content_chunk_size: usize,
    pub max_tokens: u32,
    pub api_key_set: bool,
    pub issues: Vec<String>,
}

impl ConfigSummary {
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self {
            llm_model: cfg.llm_model.clone(),
            quality_threshold: cfg.quality_threshold,
            max_sources: cfg.max_sources,
            content_chunk_size: cfg.content_chunk_size,
            max_tokens: cfg.max_tokens,
            api_key_set: cfg.api_key_set(),
            issues: cfg.validate_config(),
        }
    }

    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let model = if self.llm_model.trim().is_empty() {
            UNKNOWN.to_string()
        } else {
            self.llm_model.clone()
        };
        vec![
            ("LLM Model", model),
            ("Quality Threshold", self.quality_threshold.to_string()),
            ("Max Sources", self.max_sources.to_string()),
            ("Content Chunk Size", self.content_chunk_size.to_string()),
            ("Max Tokens", self.max_tokens.to_string()),
        ]
    }
}
