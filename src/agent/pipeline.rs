//! The shipped content sourcing agent: fetch → analyze → filter → store.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::agent::analyze::{first_chunk, heuristic_analysis, word_count};
use crate::agent::fetch::{Fetcher, HttpFetcher};
use crate::agent::llm::{build_llm_client, check_base_url, DynLlm};
use crate::agent::store::{content_id, ContentStore};
use crate::agent::types::{
    ContentMetadata, ProcessedContent, RawContent, RunResult, StoredContent,
};
use crate::agent::ContentAgent;
use crate::config::agent::{
    AgentConfig, DEFAULT_CONTENT_CHUNK_SIZE, DEFAULT_MAX_SOURCES, DEFAULT_QUALITY_THRESHOLD,
};
use crate::metrics::ensure_metrics_described;

pub struct SourcingAgent {
    fetcher: Arc<dyn Fetcher>,
    llm: DynLlm,
    store: Arc<ContentStore>,
    model: String,
    quality_threshold: f32,
    max_sources: usize,
    content_chunk_size: usize,
}

impl SourcingAgent {
    /// Build an agent with an HTTP fetcher, an in-memory store and default limits.
    ///
    /// Fails when `base_url` is not an absolute http(s) URL or a client cannot be built.
    pub fn new(api_key: &str, model: &str, base_url: &str, max_tokens: u32) -> Result<Self> {
        check_base_url(base_url)?;
        let llm = build_llm_client(api_key, model, base_url, max_tokens)?;
        info!(
            model,
            provider = llm.provider_name(),
            key_len = api_key.trim().len(),
            "content sourcing agent initialized"
        );
        Ok(Self {
            fetcher: Arc::new(HttpFetcher::new()?),
            llm,
            store: Arc::new(ContentStore::in_memory()),
            model: model.to_string(),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            max_sources: DEFAULT_MAX_SOURCES,
            content_chunk_size: DEFAULT_CONTENT_CHUNK_SIZE,
        })
    }

    pub fn from_config(cfg: &AgentConfig) -> Result<Self> {
        let mut agent = Self::new(
            &cfg.groq_api_key,
            &cfg.llm_model,
            &cfg.llm_base_url,
            cfg.max_tokens,
        )?
        .with_quality_threshold(cfg.quality_threshold)
        .with_max_sources(cfg.max_sources)
        .with_chunk_size(cfg.content_chunk_size);
        if let Some(path) = &cfg.store_path {
            let store = ContentStore::open(path)
                .with_context(|| format!("opening content store {}", path.display()))?;
            info!(path = %path.display(), items = store.len(), "content store loaded");
            agent.store = Arc::new(store);
        }
        Ok(agent)
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_llm(mut self, llm: DynLlm) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_store(mut self, store: Arc<ContentStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_quality_threshold(mut self, threshold: f32) -> Self {
        self.quality_threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_QUALITY_THRESHOLD
        };
        self
    }

    pub fn with_max_sources(mut self, max: usize) -> Self {
        self.max_sources = max;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.content_chunk_size = size;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    async fn process(&self, query: &str, raw: &RawContent) -> ProcessedContent {
        let excerpt = first_chunk(&raw.text, self.content_chunk_size);
        let analysis = match self.llm.analyze(query, &raw.title, excerpt).await {
            Some(a) => a,
            None => {
                if self.llm.provider_name() != "disabled" {
                    counter!("sourcing_llm_fallbacks_total").increment(1);
                }
                heuristic_analysis(&raw.text, query)
            }
        };
        ProcessedContent {
            raw: raw.clone(),
            word_count: word_count(&raw.text),
            analysis,
        }
    }

    fn to_stored(&self, query: &str, p: &ProcessedContent) -> StoredContent {
        StoredContent {
            id: content_id(&p.raw.source_url, &p.raw.text),
            title: p.raw.title.clone(),
            category: p.analysis.category.clone(),
            tags: p.analysis.tags.clone(),
            quality_score: p.analysis.quality_score.clamp(0.0, 1.0),
            bloom_level: p.analysis.bloom_level.clone(),
            source_url: p.raw.source_url.clone(),
            content: p.raw.text.clone(),
            metadata: ContentMetadata {
                word_count: p.word_count,
                query: query.to_string(),
                analyzed_by: p.analysis.analyzed_by,
                summary: p.analysis.summary.clone(),
            },
            stored_at: Some(Utc::now()),
        }
    }
}

/// Trim, drop empties and duplicates (order kept), cap at `max`.
/// Returns the kept sources and how many were cut by the cap.
pub fn select_sources(sources: &[String], max: usize) -> (Vec<String>, usize) {
    let mut unique: Vec<String> = Vec::with_capacity(sources.len());
    for s in sources {
        let t = s.trim();
        if !t.is_empty() && !unique.iter().any(|u| u == t) {
            unique.push(t.to_string());
        }
    }
    let skipped = unique.len().saturating_sub(max);
    unique.truncate(max);
    (unique, skipped)
}

#[async_trait]
impl ContentAgent for SourcingAgent {
    async fn run(&self, query: &str, sources: &[String]) -> Result<RunResult> {
        ensure_metrics_described();
        counter!("sourcing_runs_total").increment(1);
        let t0 = Instant::now();

        let (sources, skipped) = select_sources(sources, self.max_sources);
        if skipped > 0 {
            warn!(skipped, max_sources = self.max_sources, "sources beyond limit skipped");
        }

        let mut result = RunResult {
            query: query.to_string(),
            sources: sources.clone(),
            ..Default::default()
        };

        for url in &sources {
            match self.fetcher.fetch(url).await {
                Ok(mut items) => {
                    debug!(%url, items = items.len(), "source fetched");
                    result.raw_content.append(&mut items);
                }
                Err(e) => {
                    warn!(error = %e, %url, fetcher = self.fetcher.name(), "source fetch failed");
                    counter!("sourcing_fetch_errors_total").increment(1);
                    result.errors.push(format!("{e:#}"));
                }
            }
        }
        counter!("sourcing_items_fetched_total").increment(result.raw_content.len() as u64);

        for raw in &result.raw_content {
            let processed = self.process(query, raw).await;
            result.processed_content.push(processed);
        }

        for p in &result.processed_content {
            // NaN scores and thresholds never pass.
            if !(p.analysis.quality_score >= self.quality_threshold) {
                debug!(
                    url = %p.raw.source_url,
                    score = p.analysis.quality_score,
                    threshold = self.quality_threshold,
                    "below quality threshold"
                );
                continue;
            }
            let item = self.to_stored(query, p);
            if self.store.insert(item.clone()) {
                result.stored_content.push(item);
            }
        }
        if !result.stored_content.is_empty() {
            if let Err(e) = self.store.persist() {
                warn!(error = %e, "content store persist failed");
                result.errors.push(format!("{e:#}"));
            }
        }
        counter!("sourcing_items_stored_total").increment(result.stored_content.len() as u64);

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("sourcing_run_ms").record(ms);
        info!(
            sources = result.sources.len(),
            fetched = result.raw_content.len(),
            processed = result.processed_content.len(),
            stored = result.stored_content.len(),
            errors = result.errors.len(),
            ms = ms as u64,
            "content sourcing run finished"
        );
        Ok(result)
    }

    async fn get_all_stored_content(&self) -> Vec<StoredContent> {
        self.store.all()
    }

    fn name(&self) -> &'static str {
        "sourcing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_sources_dedupes_trims_and_caps() {
        let input: Vec<String> = vec![" a ", "b", "", "a", "c", "d"]
            .into_iter()
            .map(String::from)
            .collect();
        let (kept, skipped) = select_sources(&input, 2);
        assert_eq!(kept, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn invalid_base_url_fails_construction() {
        assert!(SourcingAgent::new("", "m", "not a url", 10).is_err());
        assert!(SourcingAgent::new("", "m", "https://api.groq.com/", 10).is_ok());
    }
}
