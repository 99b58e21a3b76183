//! DuckDuckGo HTML search backend. Needs no API key.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use shared::search_types::{RawResultItem, SearchKind, SearchOptions, SearchResponse};
use std::sync::LazyLock;
use std::time::Duration;

use crate::{Result, SearchError, SearchProvider};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; BatteryResearchChat/1.0)";

// Each result block opens with its title link; the snippet, if any, follows it.
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"class="result__a"[^>]*href="([^"]*)"[^>]*>([^<]+)</a>"#)
        .expect("title pattern is valid")
});
static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"class="result__snippet"[^>]*>([^<]+)"#).expect("snippet pattern is valid")
});

pub struct DuckDuckGoSearch {
    http: Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Results page for a search kind. The keyless HTML frontend only serves web results.
fn endpoint(kind: SearchKind) -> &'static str {
    match kind {
        SearchKind::Web => "html",
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let page = endpoint(options.kind);
        let url = format!("{}/{}/?q={}", self.base_url, page, urlencoding::encode(query));
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(SearchError::Http(format!("status {}", resp.status())));
        }
        let html = resp.text().await?;
        let items = parse_results(&html, options.limit);
        Ok(SearchResponse {
            organic_results: Some(items),
        })
    }
}

/// Scrape result titles, links and snippets out of the HTML results page.
///
/// A snippet belongs to the title link it follows, up to the next title link.
pub fn parse_results(html: &str, limit: usize) -> Vec<RawResultItem> {
    let titles: Vec<_> = TITLE_RE.captures_iter(html).collect();
    let mut items = Vec::new();

    for (i, cap) in titles.iter().enumerate().take(limit) {
        let (Some(anchor), Some(href), Some(title)) = (cap.get(0), cap.get(1), cap.get(2)) else {
            continue;
        };
        let title = html_decode(title.as_str());
        if title.is_empty() {
            continue;
        }
        let block_end = titles
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(html.len(), |m| m.start());
        let snippet = SNIPPET_RE
            .captures(&html[anchor.end()..block_end])
            .and_then(|c| c.get(1))
            .map(|m| html_decode(m.as_str()));

        items.push(RawResultItem {
            title: Some(title),
            link: Some(resolve_redirect(href.as_str())),
            snippet,
        });
    }
    items
}

/// DuckDuckGo wraps targets in `/l/?uddg=<encoded>` redirects.
fn resolve_redirect(href: &str) -> String {
    let href = html_decode(href);
    if let Some(encoded) = href.split("uddg=").nth(1) {
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }
    if href.starts_with("//") {
        return format!("https:{}", href);
    }
    href
}

/// Basic HTML entity decoding
fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}
