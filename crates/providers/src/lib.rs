//! Streaming answer providers.
//!
//! Every provider turns a [`StreamRequest`] into a sequence of [`StreamChunk`]s
//! sent over an unbounded channel, in the order the upstream API produced them.

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod router;
pub mod sse;

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use shared::agent_api::{StreamChunk, StreamRequest};
use tokio::sync::mpsc::UnboundedSender;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
pub use router::ProviderRouter;

pub(crate) static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// The answer-streaming collaborator.
///
/// Contract: if the HTTP connection fails *before* any chunks are sent,
/// returns `Err(...)`. Once streaming starts, errors go through
/// `StreamChunk::Error` and the method returns `Ok(())`. The sender is dropped
/// when the call returns, which closes the receiving side.
#[async_trait]
pub trait AnswerStreamer: Send + Sync {
    async fn stream_text(
        &self,
        request: StreamRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()>;
}

/// Trim an error body down to something loggable.
pub(crate) fn error_detail(provider: &str, status: reqwest::StatusCode, body: &str) -> String {
    let detail: String = body.chars().take(800).collect();
    if detail.trim().is_empty() {
        format!("{} error: {}", provider, status)
    } else {
        format!("{} error: {}\n{}", provider, status, detail)
    }
}
