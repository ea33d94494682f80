// src/dashboard/render.rs
//! Server-side HTML for the dashboard page.
//!
//! Everything user- or source-supplied goes through `html_escape`; nothing is
//! rendered raw.

use chrono::{DateTime, FixedOffset, Utc};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write as _;

use crate::agent::{RunResult, StoredContent};
use crate::config::AgentConfig;
use crate::dashboard::summary::{ConfigSummary, OverviewSummary, UNKNOWN};

pub const PAGE_TITLE: &str = "Content Sourcing Agent Dashboard";
pub const NO_RESULTS_MESSAGE: &str = "No execution results yet. Run the agent to process content.";
pub const NO_CONTENT_MESSAGE: &str = "No content stored yet. Run the agent to process content.";
pub const CONFIG_VALID_MESSAGE: &str = "Configuration is valid";
pub const PREVIEW_CHARS: usize = 200;

/// India Standard Time, UTC+05:30.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Overview,
    Content,
}

impl View {
    /// `content` (any case) selects Content; anything else is Overview.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "content" => View::Content,
            _ => View::Overview,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Overview => "overview",
            View::Content => "content",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::Overview => "Overview",
            View::Content => "Content",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flash {
    Success(String),
    Error(String),
}

pub struct PageContext<'a> {
    pub view: View,
    pub query: &'a str,
    pub sources_input: &'a str,
    pub results: Option<&'a RunResult>,
    pub stored_content: &'a [StoredContent],
    pub config: &'a AgentConfig,
    pub flash: Option<Flash>,
    pub init_error: Option<&'a str>,
    pub now: DateTime<Utc>,
}

pub fn format_last_updated(now: DateTime<Utc>) -> String {
    let Some(ist) = FixedOffset::east_opt(IST_OFFSET_SECS) else {
        return format!("Last updated: {} UTC", now.format("%Y-%m-%d %H:%M:%S"));
    };
    format!(
        "Last updated: {} IST",
        now.with_timezone(&ist).format("%Y-%m-%d %H:%M:%S")
    )
}

/// First 200 characters, with `...` appended when the text was longer.
pub fn preview(content: &str) -> String {
    let mut chars = content.char_indices();
    match chars.nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

pub fn render_page(ctx: &PageContext<'_>) -> String {
    let mut out = String::with_capacity(8 * 1024);
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>{title}</title>\n<link rel=\"stylesheet\" href=\"/static/dashboard.css\">\n</head>\n<body>\n",
        title = text(PAGE_TITLE)
    );

    out.push_str(&render_sidebar(ctx));

    out.push_str("<main class=\"content\">\n");
    let _ = writeln!(out, "<h1>{}</h1>", text(PAGE_TITLE));
    let _ = writeln!(
        out,
        "<p class=\"timestamp\">{}</p>",
        text(&format_last_updated(ctx.now))
    );
    if let Some(err) = ctx.init_error {
        let _ = writeln!(out, "<div class=\"alert error\">{}</div>", text(err));
    }
    match &ctx.flash {
        Some(Flash::Success(m)) => {
            let _ = writeln!(out, "<div class=\"alert success\">{}</div>", text(m));
        }
        Some(Flash::Error(m)) => {
            let _ = writeln!(out, "<div class=\"alert error\">{}</div>", text(m));
        }
        None => {}
    }

    match ctx.view {
        View::Overview => out.push_str(&render_overview(ctx.results, ctx.config)),
        View::Content => out.push_str(&render_content(ctx.stored_content)),
    }
    out.push_str("</main>\n</body>\n</html>\n");
    out
}

/// Plain links switching the view without a run.
fn render_view_tabs(current: View) -> String {
    let mut out = String::from("<nav class=\"views\">\n");
    for v in [View::Overview, View::Content] {
        let class = if v == current { " class=\"active\"" } else { "" };
        let _ = writeln!(
            out,
            "<a href=\"/?view={}\"{class}>{}</a>",
            v.as_str(),
            v.label()
        );
    }
    out.push_str("</nav>\n");
    out
}

fn render_sidebar(ctx: &PageContext<'_>) -> String {
    let mut out = String::new();
    out.push_str("<aside class=\"sidebar\">\n<h2>Dashboard Controls</h2>\n");
    out.push_str(&render_view_tabs(ctx.view));
    out.push_str("<form method=\"post\" action=\"/run\">\n");
    out.push_str("<label for=\"view\">Select View</label>\n<select id=\"view\" name=\"view\">\n");
    for v in [View::Overview, View::Content] {
        let selected = if v == ctx.view { " selected" } else { "" };
        let _ = writeln!(
            out,
            "<option value=\"{}\"{selected}>{}</option>",
            v.as_str(),
            v.label()
        );
    }
    out.push_str("</select>\n");
    let _ = writeln!(
        out,
        "<label for=\"query\">Enter Query</label>\n<input id=\"query\" name=\"query\" type=\"text\" value=\"{}\">",
        attr(ctx.query)
    );
    let _ = writeln!(
        out,
        "<label for=\"sources\">Enter Sources (comma-separated URLs)</label>\n<textarea id=\"sources\" name=\"sources\" rows=\"8\">{}</textarea>",
        text(ctx.sources_input)
    );
    out.push_str("<button type=\"submit\">Run Content Sourcing Agent</button>\n</form>\n");
    let _ = writeln!(
        out,
        "<p class=\"footer\">Powered by {}</p>",
        text(&ctx.config.llm_model)
    );
    out.push_str("</aside>\n");
    out
}

pub fn render_overview(results: Option<&RunResult>, config: &AgentConfig) -> String {
    let mut out = String::new();
    out.push_str("<section class=\"overview\">\n<h2>Execution Summary</h2>\n");

    let summary = OverviewSummary::from_result(results);
    if summary.has_results {
        out.push_str("<ul class=\"fields\">\n");
        for (label, value) in summary.rows() {
            let _ = writeln!(out, "<li><strong>{label}:</strong> {}</li>", text(&value));
        }
        out.push_str("</ul>\n");
        if !summary.errors.is_empty() {
            out.push_str("<h3>Errors</h3>\n");
            for e in &summary.errors {
                let _ = writeln!(out, "<div class=\"alert error\">{}</div>", text(e));
            }
        }
    } else {
        let _ = writeln!(out, "<p class=\"empty\">{}</p>", text(NO_RESULTS_MESSAGE));
    }

    let cfg = ConfigSummary::from_config(config);
    out.push_str("<h3>Agent Configuration</h3>\n<ul class=\"fields\">\n");
    for (label, value) in cfg.rows() {
        let _ = writeln!(out, "<li><strong>{label}:</strong> {}</li>", text(&value));
    }
    out.push_str("</ul>\n");
    if cfg.issues.is_empty() {
        let _ = writeln!(out, "<p class=\"valid\">✅ {}</p>", CONFIG_VALID_MESSAGE);
    } else {
        out.push_str("<div class=\"alert warning\">Configuration Issues:</div>\n<ul class=\"issues\">\n");
        for issue in &cfg.issues {
            let _ = writeln!(out, "<li>{}</li>", text(issue));
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</section>\n");
    out
}

pub fn render_content(items: &[StoredContent]) -> String {
    let mut out = String::new();
    out.push_str("<section class=\"stored\">\n<h2>Processed Content</h2>\n");
    if items.is_empty() {
        let _ = writeln!(out, "<p class=\"empty\">{}</p>", text(NO_CONTENT_MESSAGE));
    }
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(
            out,
            "<details>\n<summary>{}. {}</summary>\n<ul class=\"fields\">",
            i + 1,
            text(&item.title)
        );
        let bloom = item
            .bloom_level
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(UNKNOWN);
        let rows = [
            ("Category", item.category.clone()),
            ("Tags", item.tags.join(", ")),
            ("Quality Score", format!("{:.2}", item.quality_score)),
            ("Bloom Level", bloom.to_string()),
            ("Source URL", item.source_url.clone()),
            ("Word Count", item.metadata.word_count.to_string()),
            ("Preview", preview(&item.content)),
        ];
        for (label, value) in rows {
            let _ = writeln!(out, "<li><strong>{label}:</strong> {}</li>", text(&value));
        }
        out.push_str("</ul>\n</details>\n");
    }
    out.push_str("</section>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn view_parse_defaults_to_overview() {
        assert_eq!(View::parse(Some("Content")), View::Content);
        assert_eq!(View::parse(Some(" content ")), View::Content);
        assert_eq!(View::parse(Some("other")), View::Overview);
        assert_eq!(View::parse(None), View::Overview);
    }

    #[test]
    fn preview_truncates_at_200_chars() {
        let short = "a".repeat(200);
        assert_eq!(preview(&short), short);
        let long = "é".repeat(201);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 203);
    }

    #[test]
    fn last_updated_is_shown_in_ist() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 20, 0, 0).unwrap();
        assert_eq!(
            format_last_updated(now),
            "Last updated: 2025-01-02 01:30:00 IST"
        );
    }

    #[test]
    fn content_view_escapes_and_numbers_items() {
        let items = vec![StoredContent {
            title: "<script>x</script>".into(),
            tags: vec!["ai".into(), "ecu".into()],
            quality_score: 0.756,
            ..Default::default()
        }];
        let html = render_content(&items);
        assert!(html.contains("1. &lt;script&gt;x&lt;/script&gt;"));
        assert!(html.contains("<strong>Tags:</strong> ai, ecu"));
        assert!(html.contains("<strong>Quality Score:</strong> 0.76"));
        assert!(html.contains("<strong>Bloom Level:</strong> Unknown"));
        assert!(!html.contains(NO_CONTENT_MESSAGE));
    }

    #[test]
    fn view_tabs_are_plain_links() {
        let html = render_view_tabs(View::Content);
        assert!(html.contains("<a href=\"/?view=overview\">"));
        assert!(html.contains("<a href=\"/?view=content\" class=\"active\">"));
        assert!(!html.contains("onchange"));
    }

    #[test]
    fn empty_states() {
        let cfg = AgentConfig::default();
        assert!(render_overview(None, &cfg).contains(NO_RESULTS_MESSAGE));
        assert!(render_content(&[]).contains(NO_CONTENT_MESSAGE));
    }
}
