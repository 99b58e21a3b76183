//! SerpAPI-style JSON search backend.

use async_trait::async_trait;
use reqwest::Client;
use shared::search_types::{SearchKind, SearchOptions, SearchResponse};
use std::time::Duration;

use crate::{Result, SearchError, SearchProvider};

const DEFAULT_BASE_URL: &str = "https://serpapi.com";

/// SerpApi engine serving a search kind.
fn engine(kind: SearchKind) -> &'static str {
    match kind {
        SearchKind::Web => "google",
    }
}

pub struct SerpApiSearch {
    http: Client,
    api_key: String,
    base_url: String,
}

impl SerpApiSearch {
    pub fn new(api_key: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    fn name(&self) -> &'static str {
        "serpapi"
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let url = format!("{}/search.json", self.base_url);
        let limit = options.limit.to_string();
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("engine", engine(options.kind)),
                ("q", query),
                ("num", limit.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SearchError::Http(format!("status {}", resp.status())));
        }

        let body = resp.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| SearchError::Parse(e.to_string()))?;
        tracing::trace!(
            count = parsed.organic_results.as_ref().map_or(0, Vec::len),
            "serpapi returned results"
        );
        Ok(parsed)
    }
}
