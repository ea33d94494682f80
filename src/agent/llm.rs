//! LLM adapter: Groq / OpenAI-compatible chat completions behind a small trait.
//!
//! A failed call never fails the run; callers fall back to the heuristics in
//! `agent::analyze`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agent::analyze::{clean_tags, normalize_bloom_level, normalize_category};
use crate::agent::types::{Analysis, AnalyzedBy};

const MAX_SUMMARY_CHARS: usize = 300;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

pub trait LlmClient: Send + Sync {
    /// Analyze an excerpt in the context of the user's query.
    fn analyze<'a>(
        &'a self,
        query: &'a str,
        title: &'a str,
        excerpt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Analysis>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynLlm = Arc<dyn LlmClient>;

/// Factory used by the agent.
///
/// * `LLM_TEST_MODE=mock` → deterministic `StaticLlm`.
/// * empty API key → `DisabledLlm`.
/// * otherwise the real chat completions client.
pub fn build_llm_client(
    api_key: &str,
    model: &str,
    base_url: &str,
    max_tokens: u32,
) -> Result<DynLlm> {
    if std::env::var("LLM_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(StaticLlm::mock()));
    }
    if api_key.trim().is_empty() {
        return Ok(Arc::new(DisabledLlm));
    }
    Ok(Arc::new(ChatCompletionsClient::new(
        api_key, model, base_url, max_tokens,
    )?))
}

/// Validate an LLM base URL: absolute http(s).
pub fn check_base_url(base_url: &str) -> Result<reqwest::Url> {
    let url = reqwest::Url::parse(base_url.trim())
        .with_context(|| format!("invalid LLM base URL '{base_url}'"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!("unsupported LLM base URL scheme '{other}'")),
    }
}

/// `https://api.groq.com/` → `https://api.groq.com/openai/v1/chat/completions`;
/// bases already ending in `/v1` only get `/chat/completions`.
pub fn completions_url(base_url: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/openai/v1/chat/completions")
    }
}

// ------------------------------------------------------------
// Chat completions client
// ------------------------------------------------------------

pub struct ChatCompletionsClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub fn new(api_key: &str, model: &str, base_url: &str, max_tokens: u32) -> Result<Self> {
        check_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .user_agent("content-sourcing-dashboard/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building LLM http client")?;
        Ok(Self {
            http,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            endpoint: completions_url(base_url),
            max_tokens,
        })
    }

    async fn analyze_impl(&self, query: &str, title: &str, excerpt: &str) -> Option<Analysis> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let sys = "You grade sourced content for an educational content library. \
Reply with ONE JSON object and nothing else: \
{\"quality_score\": number 0..1, \"category\": string, \"tags\": [up to 5 short strings], \
\"bloom_level\": one of Remember|Understand|Apply|Analyze|Evaluate|Create, \
\"summary\": one sentence}.";
        let user = format!("Query: {query}\nTitle: {title}\n\nContent:\n{excerpt}");
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: sys,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.2,
            max_tokens: self.max_tokens,
        };

        let resp = match self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, model = %self.model, "llm request failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            warn!(status = resp.status().as_u16(), model = %self.model, "llm non-success status");
            return None;
        }
        let body: Resp = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "llm response was not chat completions json");
                return None;
            }
        };
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        let parsed = parse_analysis(content);
        if parsed.is_none() {
            warn!(reply_len = content.len(), "llm reply had no usable analysis");
        }
        parsed
    }
}

impl LlmClient for ChatCompletionsClient {
    fn analyze<'a>(
        &'a self,
        query: &'a str,
        title: &'a str,
        excerpt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Analysis>> + Send + 'a>> {
        Box::pin(self.analyze_impl(query, title, excerpt))
    }
    fn provider_name(&self) -> &'static str {
        "chat_completions"
    }
}

/// Returns `None` always; used when no API key is configured.
pub struct DisabledLlm;

impl LlmClient for DisabledLlm {
    fn analyze<'a>(
        &'a self,
        _query: &'a str,
        _title: &'a str,
        _excerpt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Analysis>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed answer for tests/local runs.
#[derive(Clone)]
pub struct StaticLlm {
    pub fixed: Analysis,
}

impl StaticLlm {
    pub fn mock() -> Self {
        Self {
            fixed: Analysis {
                quality_score: 0.8,
                category: "Technology".to_string(),
                tags: vec!["mock".to_string()],
                bloom_level: Some("Understand".to_string()),
                summary: Some("Mock analysis".to_string()),
                analyzed_by: AnalyzedBy::Llm,
            },
        }
    }
}

impl LlmClient for StaticLlm {
    fn analyze<'a>(
        &'a self,
        _query: &'a str,
        _title: &'a str,
        _excerpt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Analysis>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Some(out) })
    }
    fn provider_name(&self) -> &'static str {
        "static"
    }
}

// ------------------------------------------------------------
// Reply parsing
// ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LlmReply {
    quality_score: Option<f32>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    bloom_level: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// Parse the first `{...}` block of a reply. A missing score means no analysis.
pub fn parse_analysis(reply: &str) -> Option<Analysis> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    let parsed: LlmReply = serde_json::from_str(&reply[start..=end]).ok()?;
    let score = parsed.quality_score?;
    if !score.is_finite() {
        return None;
    }
    Some(Analysis {
        quality_score: score.clamp(0.0, 1.0),
        category: normalize_category(parsed.category.as_deref().unwrap_or_default()),
        tags: clean_tags(parsed.tags),
        bloom_level: parsed.bloom_level.as_deref().and_then(normalize_bloom_level),
        summary: parsed
            .summary
            .map(|s| sanitize_summary(&s))
            .filter(|s| !s.is_empty()),
        analyzed_by: AnalyzedBy::Llm,
    })
}

/// Single line, collapsed whitespace, capped length.
pub fn sanitize_summary(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_SUMMARY_CHARS).collect()
}
