// src/agent/analyze.rs
//! Heuristic content analysis: quality score, category, tags and Bloom level.
//!
//! Used on its own when no LLM is configured, and as the fallback whenever the
//! LLM call fails. LLM labels are mapped back onto the same vocabularies.

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};

use crate::agent::types::{Analysis, AnalyzedBy};

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_BLOOM_LEVEL: &str = "Remember";
pub const MAX_TAGS: usize = 5;

/// Category name with its keyword cues. Order breaks ties.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Technology",
        &[
            "software", "algorithm", "computer", "network", "data", "artificial",
            "intelligence", "machine", "learning", "neural", "model", "cloud",
        ],
    ),
    (
        "Automotive",
        &[
            "vehicle", "automotive", "car", "engine", "ecu", "autosar", "driver",
            "driving", "brake", "j1939", "truck", "powertrain",
        ],
    ),
    (
        "Science",
        &[
            "research", "experiment", "theory", "physics", "chemistry", "biology",
            "hypothesis", "scientific", "study", "paper",
        ],
    ),
    (
        "Business",
        &[
            "market", "company", "revenue", "industry", "customer", "business",
            "economic", "investment", "profit",
        ],
    ),
    (
        "Health",
        &[
            "health", "medical", "patient", "disease", "clinical", "treatment",
            "hospital",
        ],
    ),
    (
        "Education",
        &[
            "student", "learn", "course", "teaching", "curriculum", "school",
            "education", "lesson",
        ],
    ),
];

/// Bloom's taxonomy levels from highest to lowest with their verb cues.
const BLOOM_LEVELS: &[(&str, &[&str])] = &[
    ("Create", &["design", "create", "construct", "develop", "propose", "invent", "formulate"]),
    ("Evaluate", &["evaluate", "assess", "judge", "critique", "justify", "benchmark"]),
    ("Analyze", &["analyze", "analyse", "compare", "contrast", "examine", "investigate", "differentiate"]),
    ("Apply", &["apply", "implement", "use", "execute", "demonstrate", "solve", "deploy"]),
    ("Understand", &["explain", "describe", "summarize", "interpret", "classify", "discuss"]),
];

const BLOOM_ORDER: &[&str] = &["Remember", "Understand", "Apply", "Analyze", "Evaluate", "Create"];

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her",
        "was", "one", "our", "out", "has", "have", "his", "how", "its", "may", "new", "now",
        "see", "who", "did", "get", "use", "that", "this", "with", "from", "they", "been",
        "were", "said", "each", "which", "their", "will", "other", "about", "many", "then",
        "them", "these", "some", "would", "into", "more", "than", "also", "such", "when",
        "what", "there", "where", "while", "most", "only", "over", "used", "using", "being",
        "between", "both", "through", "after", "before", "under", "within", "those", "very",
        "could", "should", "here", "just", "like", "well", "same", "because", "since",
    ]
    .into_iter()
    .collect()
});

/// Lower-cased alphanumeric tokens.
pub fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(query)
        .filter(|t| t.chars().count() >= 3 && !STOPWORDS.contains(t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Weighted blend of query relevance, length and lexical diversity, in `[0, 1]`.
pub fn quality_score(text: &str, query: &str) -> f32 {
    let words: Vec<String> = tokenize(text).collect();
    if words.is_empty() {
        return 0.0;
    }
    let vocab: HashSet<&str> = words.iter().map(String::as_str).collect();

    let terms = query_terms(query);
    let relevance = if terms.is_empty() {
        0.5
    } else {
        let hits = terms.iter().filter(|t| vocab.contains(t.as_str())).count();
        hits as f32 / terms.len() as f32
    };
    let length = (words.len() as f32 / 300.0).min(1.0);
    let diversity = (vocab.len() as f32 / words.len() as f32 * 2.0).min(1.0);

    (0.40 * relevance + 0.35 * length + 0.25 * diversity).clamp(0.0, 1.0)
}

pub fn categorize(text: &str) -> String {
    let words: Vec<String> = tokenize(text).collect();
    let mut best: Option<(&str, usize)> = None;
    for &(name, cues) in CATEGORIES {
        let hits = words.iter().filter(|w| cues.contains(&w.as_str())).count();
        if hits > 0 && best.map_or(true, |(_, b)| hits > b) {
            best = Some((name, hits));
        }
    }
    best.map(|(n, _)| n).unwrap_or(DEFAULT_CATEGORY).to_string()
}

/// Most frequent non-stopword words (4+ chars); ties alphabetical.
pub fn extract_tags(text: &str, n: usize) -> Vec<String> {
    let mut freq: BTreeMap<String, usize> = BTreeMap::new();
    for w in tokenize(text) {
        if w.chars().count() >= 4
            && !STOPWORDS.contains(w.as_str())
            && !w.chars().all(|c| c.is_ascii_digit())
        {
            *freq.entry(w).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    // BTreeMap order is alphabetical; stable sort keeps it for equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(n).map(|(w, _)| w).collect()
}

pub fn bloom_level(text: &str) -> String {
    let vocab: HashSet<String> = tokenize(text).collect();
    for (level, cues) in BLOOM_LEVELS {
        if cues.iter().any(|c| vocab.contains(*c)) {
            return level.to_string();
        }
    }
    DEFAULT_BLOOM_LEVEL.to_string()
}

/// Full heuristic analysis of one document.
pub fn heuristic_analysis(text: &str, query: &str) -> Analysis {
    Analysis {
        quality_score: quality_score(text, query),
        category: categorize(text),
        tags: extract_tags(text, MAX_TAGS),
        bloom_level: Some(bloom_level(text)),
        summary: None,
        analyzed_by: AnalyzedBy::Heuristic,
    }
}

fn closest_label<'a>(raw: &str, labels: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    labels
        .map(|l| (l, strsim::jaro_winkler(&needle, &l.to_lowercase())))
        .filter(|(_, sim)| *sim >= 0.85)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(l, _)| l)
}

/// Map a free-form category onto the known set; unknown labels become `General`.
pub fn normalize_category(raw: &str) -> String {
    let first_word = raw.split(|c: char| !c.is_alphanumeric()).find(|w| !w.is_empty());
    closest_label(raw, CATEGORIES.iter().map(|(n, _)| *n))
        .or_else(|| first_word.and_then(|w| closest_label(w, CATEGORIES.iter().map(|(n, _)| *n))))
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string()
}

pub fn normalize_bloom_level(raw: &str) -> Option<String> {
    closest_label(raw, BLOOM_ORDER.iter().copied()).map(str::to_string)
}

/// First chunk of at most `size` chars, cut at the last whitespace when possible.
pub fn first_chunk(text: &str, size: usize) -> &str {
    if size == 0 {
        return "";
    }
    match text.char_indices().nth(size) {
        None => text,
        Some((cut, _)) => {
            let head = &text[..cut];
            match head.rfind(char::is_whitespace) {
                Some(ws) if ws > 0 => head[..ws].trim_end(),
                _ => head,
            }
        }
    }
}

/// Clean tags coming from an LLM: trimmed, lower-cased, deduped, capped.
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for t in tags {
        let t = t.trim().trim_start_matches('#').to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
        if out.len() >= MAX_TAGS {
            break;
        }
    }
    out
}
