//! Web search backends used to find papers.
//!
//! Each backend answers one query at a time; fan-out and failure handling
//! live in the research core.

pub mod duckduckgo;
pub mod serpapi;

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use shared::search_types::{SearchOptions, SearchResponse};
use shared::settings::SearchSettings;

pub use duckduckgo::DuckDuckGoSearch;
pub use serpapi::SerpApiSearch;

/// Errors a search backend can report for a single query.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body could not be understood.
    #[error("parse error: {0}")]
    Parse(String),

    /// The backend is not usable with the current settings.
    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// The search collaborator: one query in, zero or more organic hits out.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse>;
}

/// Pick a backend from settings.
///
/// An explicit `backend` wins; otherwise SerpAPI is used when a key is
/// available (settings or `SERPAPI_API_KEY`), DuckDuckGo when not.
pub fn build_search_provider(settings: &SearchSettings) -> Result<Arc<dyn SearchProvider>> {
    let api_key = settings
        .api_key
        .clone()
        .or_else(|| env::var("SERPAPI_API_KEY").ok());

    let backend = match settings.backend.as_deref() {
        Some(name) => name.to_lowercase(),
        None if api_key.is_some() => "serpapi".to_string(),
        None => "duckduckgo".to_string(),
    };

    match backend.as_str() {
        "serpapi" => {
            let key = api_key
                .ok_or_else(|| SearchError::Config("serpapi backend needs an API key".into()))?;
            let mut search = SerpApiSearch::new(key);
            if let Some(base) = settings.base_url.as_deref() {
                search = search.with_base_url(base);
            }
            Ok(Arc::new(search))
        }
        "duckduckgo" => {
            let mut search = DuckDuckGoSearch::new();
            if let Some(base) = settings.base_url.as_deref() {
                search = search.with_base_url(base);
            }
            Ok(Arc::new(search))
        }
        other => Err(SearchError::Config(format!("unknown search backend: {}", other))),
    }
}
