// tests/pipeline.rs
//
// SourcingAgent end-to-end with fixture fetchers (no network) and fixed LLM answers.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use content_sourcing_dashboard::agent::fetch::{parse_body, Fetcher};
use content_sourcing_dashboard::agent::llm::{DisabledLlm, StaticLlm};
use content_sourcing_dashboard::agent::store::ContentStore;
use content_sourcing_dashboard::agent::{
    Analysis, AnalyzedBy, ContentAgent, RawContent, SourcingAgent,
};

const AUTOSAR_PAGE: &str = r#"<html><head><title>AUTOSAR - Wikipedia</title></head><body>
<p>AUTOSAR (AUTomotive Open System ARchitecture) is a global development partnership of
automotive interested parties founded in 2003. It pursues the objective to create and
establish an open and standardized software architecture for automotive electronic control
units (ECUs). Goals include the scalability to different vehicle and platform variants,
transferability of software, the consideration of availability and safety requirements,
a collaboration between various partners, sustainable use of natural resources, and
maintainability during the product lifecycle.</p></body></html>"#;

const FEED: &str = r#"<?xml version="1.0"?><rss version="2.0"><channel>
<item><title>ECU update</title><link>https://news.example/ecu</link><description>Artificial intelligence in automotive ECUs</description></item>
<item><title>Brake news</title><link>https://news.example/brake</link><description>Brake systems</description></item>
</channel></rss>"#;

/// URL → body; unknown URLs fail like a 404.
struct FixtureFetcher {
    pages: HashMap<String, String>,
}

impl FixtureFetcher {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(u, b)| (u.to_string(), b.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<RawContent>> {
        match self.pages.get(url) {
            Some(body) => parse_body(url, body),
            None => Err(anyhow!("{url}: HTTP 404")),
        }
    }
    fn name(&self) -> &'static str {
        "fixture"
    }
}

fn fixed_llm(score: f32) -> Arc<StaticLlm> {
    Arc::new(StaticLlm {
        fixed: Analysis {
            quality_score: score,
            category: "Automotive".into(),
            tags: vec!["autosar".into()],
            bloom_level: Some("Understand".into()),
            summary: Some("Standard automotive software architecture.".into()),
            analyzed_by: AnalyzedBy::Llm,
        },
    })
}

fn agent_with(fetcher: FixtureFetcher) -> SourcingAgent {
    SourcingAgent::new("", "gemma2-9b-it", "https://api.groq.com/", 500)
        .expect("agent")
        .with_fetcher(Arc::new(fetcher))
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn run_collects_errors_and_stores_items_above_threshold() {
    let agent = agent_with(FixtureFetcher::new(&[
        ("https://en.wikipedia.org/wiki/AUTOSAR", AUTOSAR_PAGE),
        ("https://news.example/feed", FEED),
    ]))
    .with_llm(fixed_llm(0.9))
    .with_quality_threshold(0.6);

    let r = agent
        .run(
            "automotive software",
            &urls(&[
                "https://en.wikipedia.org/wiki/AUTOSAR",
                "https://missing.example",
                "https://news.example/feed",
            ]),
        )
        .await
        .unwrap();

    assert_eq!(r.query, "automotive software");
    assert_eq!(r.sources.len(), 3);
    assert_eq!(r.raw_content.len(), 3, "one page + two feed items");
    assert_eq!(r.processed_content.len(), 3);
    assert_eq!(r.stored_content.len(), 3);
    assert_eq!(r.errors, vec!["https://missing.example: HTTP 404".to_string()]);

    let first = &r.stored_content[0];
    assert_eq!(first.title, "AUTOSAR - Wikipedia");
    assert_eq!(first.category, "Automotive");
    assert_eq!(first.bloom_level.as_deref(), Some("Understand"));
    assert_eq!(first.metadata.analyzed_by, AnalyzedBy::Llm);
    assert!(first.metadata.word_count > 50);
    assert_eq!(first.id.len(), 16);
    assert_eq!(r.stored_content[1].source_url, "https://news.example/ecu");

    assert_eq!(agent.get_all_stored_content().await.len(), 3);
}

#[tokio::test]
async fn items_below_threshold_are_processed_but_not_stored() {
    let agent = agent_with(FixtureFetcher::new(&[("https://a.example", AUTOSAR_PAGE)]))
        .with_llm(fixed_llm(0.3))
        .with_quality_threshold(0.6);

    let r = agent.run("anything", &urls(&["https://a.example"])).await.unwrap();
    assert_eq!(r.processed_content.len(), 1);
    assert!(r.stored_content.is_empty());
    assert!(agent.get_all_stored_content().await.is_empty());
}

#[tokio::test]
async fn heuristics_apply_without_llm() {
    let agent = agent_with(FixtureFetcher::new(&[("https://a.example", AUTOSAR_PAGE)]))
        .with_llm(Arc::new(DisabledLlm))
        .with_quality_threshold(0.0);

    let r = agent
        .run("automotive software architecture", &urls(&["https://a.example"]))
        .await
        .unwrap();
    let p = &r.processed_content[0];
    assert_eq!(p.analysis.analyzed_by, AnalyzedBy::Heuristic);
    assert_eq!(p.analysis.category, "Automotive");
    assert!(p.analysis.quality_score > 0.5);
    assert!(!p.analysis.tags.is_empty());
    assert_eq!(r.stored_content.len(), 1);
}

#[tokio::test]
async fn repeated_runs_do_not_duplicate_and_sources_are_capped() {
    let agent = agent_with(FixtureFetcher::new(&[
        ("https://a.example", AUTOSAR_PAGE),
        ("https://b.example", FEED),
    ]))
    .with_llm(fixed_llm(0.9))
    .with_max_sources(1);

    let sources = urls(&["https://a.example", "https://a.example", "https://b.example"]);
    let first = agent.run("q", &sources).await.unwrap();
    assert_eq!(first.sources, vec!["https://a.example".to_string()]);
    assert_eq!(first.stored_content.len(), 1);

    let second = agent.run("q", &sources).await.unwrap();
    assert_eq!(second.processed_content.len(), 1);
    assert!(second.stored_content.is_empty(), "already stored");
    assert_eq!(agent.get_all_stored_content().await.len(), 1);
}

#[tokio::test]
async fn file_store_survives_a_new_agent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("content.json");

    let store = Arc::new(ContentStore::open(&path).unwrap());
    let agent = agent_with(FixtureFetcher::new(&[("https://a.example", AUTOSAR_PAGE)]))
        .with_llm(fixed_llm(0.9))
        .with_store(store);
    agent.run("q", &urls(&["https://a.example"])).await.unwrap();

    let reopened = ContentStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.all()[0].title, "AUTOSAR - Wikipedia");
}

#[tokio::test]
async fn empty_sources_yield_empty_result() {
    let agent = agent_with(FixtureFetcher::new(&[])).with_llm(fixed_llm(0.9));
    let r = agent.run("q", &[]).await.unwrap();
    assert!(r.sources.is_empty());
    assert!(r.raw_content.is_empty());
    assert!(r.errors.is_empty());
}

#[tokio::test]
async fn non_finite_threshold_falls_back_to_default() {
    let agent = agent_with(FixtureFetcher::new(&[("https://a.example", AUTOSAR_PAGE)]))
        .with_llm(fixed_llm(0.01))
        .with_quality_threshold(f32::NAN);

    let r = agent.run("q", &urls(&["https://a.example"])).await.unwrap();
    assert_eq!(r.processed_content.len(), 1);
    assert!(r.stored_content.is_empty(), "0.01 is below the default threshold");
    assert!(agent.get_all_stored_content().await.is_empty());
}
