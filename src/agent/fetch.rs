// src/agent/fetch.rs
//! Source fetching: HTML pages and RSS feeds into `RawContent`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::agent::types::{RawContent, RawKind};

const USER_AGENT: &str = "content-sourcing-dashboard/0.1";
const MAX_TITLE_CHARS: usize = 150;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one source. A page yields one item, a feed one item per entry.
    async fn fetch(&self, url: &str) -> Result<Vec<RawContent>>;
    fn name(&self) -> &'static str;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<RawContent>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("{url}: request failed"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{url}: HTTP {}", status.as_u16()));
        }
        let body = resp
            .text()
            .await
            .with_context(|| format!("{url}: reading body"))?;
        parse_body(url, &body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Dispatch on body shape: RSS feeds are split into items, everything else is a page.
pub fn parse_body(url: &str, body: &str) -> Result<Vec<RawContent>> {
    let items = if looks_like_rss(body) {
        parse_rss(url, body)?
    } else {
        vec![parse_html_page(url, body)]
    };
    let items: Vec<RawContent> = items.into_iter().filter(|it| !it.text.is_empty()).collect();
    if items.is_empty() {
        return Err(anyhow!("{url}: no readable content"));
    }
    Ok(items)
}

fn looks_like_rss(body: &str) -> bool {
    let head: String = body.chars().take(512).collect::<String>().to_ascii_lowercase();
    head.contains("<rss") || head.contains("<channel>")
}

static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));
const NOISE_TAGS: &[&str] = &["script", "style", "noscript", "svg", "header", "footer", "nav"];
// One pattern per tag so an element only closes on its own end tag.
static RE_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    NOISE_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("noise regex"))
        .collect()
});
static RE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex"));
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

pub fn parse_html_page(url: &str, html: &str) -> RawContent {
    let title = RE_TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| normalize_text(m.as_str()))
        .filter(|t| !t.is_empty())
        .map(|t| t.chars().take(MAX_TITLE_CHARS).collect::<String>())
        .unwrap_or_else(|| url.to_string());

    let without_title = RE_TITLE.replace_all(html, " ");
    let without_comments = RE_COMMENT.replace_all(&without_title, " ");
    let without_noise = RE_NOISE
        .iter()
        .fold(without_comments.into_owned(), |acc, re| {
            re.replace_all(&acc, " ").into_owned()
        });

    RawContent {
        source_url: url.to_string(),
        title,
        text: normalize_text(&without_noise),
        fetched_at: Some(Utc::now()),
        published_at: None,
        kind: RawKind::Page,
    }
}

/// Strip tags, decode entities, normalize typographic quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let stripped = RE_TAGS.replace_all(s, " ");
    let decoded = html_escape::decode_html_entities(&stripped)
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace('\u{00A0}', " ");
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.unix_timestamp())
}

fn parse_rss(url: &str, xml: &str) -> Result<Vec<RawContent>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).with_context(|| format!("{url}: parsing rss xml"))?;
    let now = Utc::now();

    let out = rss
        .channel
        .item
        .into_iter()
        .map(|it| {
            let title = it
                .title
                .as_deref()
                .map(normalize_text)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| url.to_string());
            let text = normalize_text(&format!(
                "{}. {}",
                it.title.as_deref().unwrap_or_default(),
                it.description.as_deref().unwrap_or_default()
            ));
            RawContent {
                source_url: it
                    .link
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| url.to_string()),
                title,
                text: if text == "." { String::new() } else { text },
                fetched_at: Some(now),
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
                kind: RawKind::FeedItem,
            }
        })
        .collect();
    Ok(out)
}

// quick-xml only knows the five XML entities.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_page_drops_scripts_and_keeps_title() {
        let html = r#"<html><head><title> AUTOSAR &amp; ECUs </title>
            <style>body { color: red }</style></head>
            <body><nav>Menu Home</nav><script>var x = 1;</script>
            <p>AUTOSAR is a <b>standardized</b>&nbsp;architecture.</p><!-- hidden --></body></html>"#;
        let item = parse_html_page("https://example.org/a", html);
        assert_eq!(item.title, "AUTOSAR & ECUs");
        assert_eq!(item.text, "AUTOSAR is a standardized architecture.");
        assert_eq!(item.kind, RawKind::Page);
    }

    #[test]
    fn nested_header_and_nav_are_removed_whole() {
        let html = "<header><nav>Home About</nav>Site banner text</header>\
            <p>Body text</p><footer>Copyright</footer>";
        let item = parse_html_page("https://example.org/n", html);
        assert_eq!(item.text, "Body text");
    }

    #[test]
    fn missing_title_falls_back_to_url() {
        let item = parse_html_page("https://example.org/b", "<p>Body text</p>");
        assert_eq!(item.title, "https://example.org/b");
    }

    #[test]
    fn rss_body_yields_feed_items() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Feed</title>
            <item><title>First&nbsp;post</title><link>https://example.org/1</link>
            <pubDate>Tue, 10 Jun 2025 12:00:00 +0000</pubDate>
            <description>Vehicle software news</description></item>
            <item><title>Second</title><description>More</description></item>
            </channel></rss>"#;
        let items = parse_body("https://example.org/feed", xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source_url, "https://example.org/1");
        assert_eq!(items[0].text, "First post. Vehicle software news");
        assert_eq!(items[0].published_at, Some(1_749_556_800));
        assert_eq!(items[1].source_url, "https://example.org/feed");
        assert!(items.iter().all(|i| i.kind == RawKind::FeedItem));
    }

    #[test]
    fn empty_page_is_an_error() {
        let err = parse_body("https://example.org/e", "<html><script>x</script></html>")
            .unwrap_err();
        assert!(err.to_string().contains("no readable content"));
    }
}
