// src/agent/types.rs
//! Records exchanged between the agent and the dashboard.
//!
//! Every field has a serde default: results coming from another agent (or an
//! older store file) must still deserialize and render.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawKind {
    #[default]
    Page,
    FeedItem,
}

/// One fetched document before analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawContent {
    pub source_url: String,
    pub title: String,
    /// Normalized plain text.
    pub text: String,
    pub fetched_at: Option<DateTime<Utc>>,
    pub published_at: Option<i64>,
    pub kind: RawKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzedBy {
    Llm,
    #[default]
    Heuristic,
}

impl AnalyzedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzedBy::Llm => "llm",
            AnalyzedBy::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    pub quality_score: f32,
    pub category: String,
    pub tags: Vec<String>,
    pub bloom_level: Option<String>,
    pub summary: Option<String>,
    pub analyzed_by: AnalyzedBy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessedContent {
    pub raw: RawContent,
    pub analysis: Analysis,
    pub word_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentMetadata {
    pub word_count: usize,
    pub query: String,
    pub analyzed_by: AnalyzedBy,
    pub summary: Option<String>,
}

/// A stored content item as listed in the Content view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredContent {
    pub id: String,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub quality_score: f32,
    pub bloom_level: Option<String>,
    pub source_url: String,
    pub content: String,
    pub metadata: ContentMetadata,
    pub stored_at: Option<DateTime<Utc>>,
}

/// Outcome of one agent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunResult {
    pub query: String,
    pub sources: Vec<String>,
    pub raw_content: Vec<RawContent>,
    pub processed_content: Vec<ProcessedContent>,
    pub stored_content: Vec<StoredContent>,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_records_fall_back_to_defaults() {
        let r: RunResult = serde_json::from_str(r#"{"sources": ["a", "b"]}"#).unwrap();
        assert_eq!(r.query, "");
        assert_eq!(r.sources.len(), 2);
        assert!(r.errors.is_empty());

        let s: StoredContent =
            serde_json::from_str(r#"{"title": "T", "metadata": {}}"#).unwrap();
        assert_eq!(s.title, "T");
        assert_eq!(s.bloom_level, None);
        assert_eq!(s.metadata.word_count, 0);
        assert_eq!(s.metadata.analyzed_by, AnalyzedBy::Heuristic);
    }
}
