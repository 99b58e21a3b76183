use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{StreamChunk, StreamRequest};
use shared::settings::ProviderAuth;
use std::env;
use tokio::sync::mpsc::UnboundedSender;

use crate::sse::SseParser;
use crate::{error_detail, AnswerStreamer, SHARED_HTTP};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

/// The subset of streaming events we act on.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamEvent {
    ContentBlockDelta {
        delta: AnthropicDelta,
    },
    MessageDelta {
        #[serde(default)]
        delta: AnthropicMessageDelta,
    },
    MessageStop,
    Error {
        error: AnthropicError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicMessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    message: String,
}

pub struct AnthropicClient {
    http: Client,
    auth_token: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn from_auth(model: &str, auth: &ProviderAuth) -> Result<Self> {
        let auth_token = match &auth.api_key {
            Some(api_key) => api_key.clone(),
            // Try environment variable as fallback
            None => env::var("ANTHROPIC_API_KEY")
                .map_err(|_| anyhow!("No Anthropic authentication configured"))?,
        };

        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token,
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, request: &StreamRequest) -> AnthropicRequest {
        let tools = if request.enable_web_search {
            vec![serde_json::json!({
                "type": "web_search_20250305",
                "name": "web_search",
                "max_uses": 5
            })]
        } else {
            Vec::new()
        };

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_output_tokens,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            stream: true,
            tools,
        }
    }
}

#[async_trait]
impl AnswerStreamer for AnthropicClient {
    async fn stream_text(
        &self,
        request: StreamRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let url = format!("{}/v1/messages", self.base_url);
        let req = self.build_request(&request);

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.auth_token)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(error_detail("anthropic", status, &body)));
        }

        let mut parser = SseParser::new();
        let mut stream = resp.bytes_stream();
        let mut stop_reason = None;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!("stream read error: {}", e)));
                    return Ok(());
                }
            };
            for event in parser.feed(&bytes) {
                let Ok(parsed) = serde_json::from_str::<AnthropicStreamEvent>(&event.data) else {
                    continue;
                };
                match parsed {
                    AnthropicStreamEvent::ContentBlockDelta {
                        delta: AnthropicDelta::TextDelta { text },
                    } => {
                        if !text.is_empty() {
                            let _ = tx.send(StreamChunk::Text(text));
                        }
                    }
                    AnthropicStreamEvent::MessageDelta { delta } => {
                        if delta.stop_reason.is_some() {
                            stop_reason = delta.stop_reason;
                        }
                    }
                    AnthropicStreamEvent::MessageStop => {
                        let _ = tx.send(StreamChunk::Done { stop_reason });
                        return Ok(());
                    }
                    AnthropicStreamEvent::Error { error } => {
                        let _ = tx.send(StreamChunk::Error(error.message));
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }

        let _ = tx.send(StreamChunk::Done { stop_reason });
        Ok(())
    }
}
