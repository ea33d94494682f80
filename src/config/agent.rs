// src/config/agent.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const ENV_CONFIG_PATH: &str = "AGENT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

pub const DEFAULT_LLM_MODEL: &str = "gemma2-9b-it";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_QUALITY_THRESHOLD: f32 = 0.6;
pub const DEFAULT_MAX_SOURCES: usize = 10;
pub const DEFAULT_CONTENT_CHUNK_SIZE: usize = 2000;
pub const DEFAULT_TEST_QUERY: &str = "artificial intelligence in automotive systems";

pub const DEFAULT_STATIC_SOURCES: [&str; 6] = [
    "https://en.wikipedia.org/wiki/AUTOSAR",
    "https://en.wikipedia.org/wiki/Artificial_intelligence",
    "https://arxiv.org/abs/2303.08774",
    "https://en.wikipedia.org/wiki/Electronic_control_unit",
    "https://www.sae.org/standards/content/j1939_201808/",
    "https://arxiv.org/abs/2006.06068",
];

/// Settings shared by the dashboard and the sourcing agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub groq_api_key: String,
    pub llm_model: String,
    pub llm_base_url: String,
    pub max_tokens: u32,
    pub static_sources: Vec<String>,
    /// Minimum quality score (0..=1) an item needs to be stored.
    pub quality_threshold: f32,
    pub max_sources: usize,
    /// Characters of cleaned text handed to the LLM per item.
    pub content_chunk_size: usize,
    /// JSON file backing the content store; in-memory only when absent.
    pub store_path: Option<PathBuf>,
    /// Problems found while loading (bad numbers in env etc.).
    #[serde(skip)]
    pub load_issues: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            groq_api_key: String::new(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            static_sources: DEFAULT_STATIC_SOURCES.iter().map(|s| s.to_string()).collect(),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            max_sources: DEFAULT_MAX_SOURCES,
            content_chunk_size: DEFAULT_CONTENT_CHUNK_SIZE,
            store_path: None,
            load_issues: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Defaults, then TOML file, then environment.
    ///
    /// File lookup: `$AGENT_CONFIG_PATH` (must exist), else `config/agent.toml` if present.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let fallback = Path::new(DEFAULT_CONFIG_PATH);
                if fallback.exists() {
                    Self::load_from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading agent config from {}", path.display()))?;
        Self::from_toml_str(&data)
            .with_context(|| format!("parsing agent config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AgentConfig = toml::from_str(s)?;
        cfg.static_sources = clean_sources(cfg.static_sources);
        Ok(cfg)
    }

    /// Overlay environment variables named after the config attributes.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_str("GROQ_API_KEY") {
            self.groq_api_key = v;
        }
        if let Some(v) = env_str("LLM_MODEL") {
            self.llm_model = v;
        }
        if let Some(v) = env_str("LLM_BASE_URL") {
            self.llm_base_url = v;
        }
        if let Some(v) = env_str("STATIC_SOURCES") {
            self.static_sources = clean_sources(v.split(',').map(str::to_string).collect());
        }
        if let Some(v) = env_str("CONTENT_STORE_PATH") {
            self.store_path = Some(PathBuf::from(v));
        }
        parse_env_into("MAX_TOKENS", &mut self.max_tokens, &mut self.load_issues);
        parse_env_finite(
            "QUALITY_THRESHOLD",
            &mut self.quality_threshold,
            &mut self.load_issues,
        );
        parse_env_into("MAX_SOURCES", &mut self.max_sources, &mut self.load_issues);
        parse_env_into(
            "CONTENT_CHUNK_SIZE",
            &mut self.content_chunk_size,
            &mut self.load_issues,
        );
    }

    /// Human-readable configuration problems; empty when the config is usable.
    pub fn validate_config(&self) -> Vec<String> {
        let mut issues = self.load_issues.clone();
        if self.groq_api_key.trim().is_empty() {
            issues.push("GROQ_API_KEY is not set; LLM analysis is disabled".to_string());
        }
        if self.llm_model.trim().is_empty() {
            issues.push("LLM_MODEL is empty".to_string());
        }
        let base = self.llm_base_url.trim().to_ascii_lowercase();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            issues.push(format!(
                "LLM_BASE_URL must start with http:// or https:// (got '{}')",
                self.llm_base_url
            ));
        }
        if self.max_tokens == 0 {
            issues.push("MAX_TOKENS must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.quality_threshold) {
            issues.push(format!(
                "QUALITY_THRESHOLD must be between 0 and 1 (got {})",
                self.quality_threshold
            ));
        }
        if self.max_sources == 0 {
            issues.push("MAX_SOURCES must be greater than 0".to_string());
        }
        if self.content_chunk_size == 0 {
            issues.push("CONTENT_CHUNK_SIZE must be greater than 0".to_string());
        }
        if self.static_sources.is_empty() {
            issues.push("STATIC_SOURCES is empty".to_string());
        }
        issues
    }

    pub fn api_key_set(&self) -> bool {
        !self.groq_api_key.trim().is_empty()
    }
}

/// Initial value of the query input: `$TEST_QUERY` or the built-in sample query.
pub fn default_query() -> String {
    env_str("TEST_QUERY").unwrap_or_else(|| DEFAULT_TEST_QUERY.to_string())
}

/// Initial value of the sources input: `$TEST_SOURCES` or the configured static sources.
pub fn default_sources_input(cfg: &AgentConfig) -> String {
    env_str("TEST_SOURCES").unwrap_or_else(|| cfg.static_sources.join(","))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_into<T: std::str::FromStr>(key: &str, slot: &mut T, issues: &mut Vec<String>) {
    let Some(raw) = env_str(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => issues.push(format!("{key} has an invalid value '{raw}'; using default")),
    }
}

fn parse_env_finite(key: &str, slot: &mut f32, issues: &mut Vec<String>) {
    let mut v = *slot;
    parse_env_into(key, &mut v, issues);
    if v.is_finite() {
        *slot = v;
    } else {
        issues.push(format!("{key} must be a finite number; using default"));
    }
}

fn clean_sources(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
