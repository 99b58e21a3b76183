use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{StreamChunk, StreamRequest};
use std::env;
use tokio::sync::mpsc::UnboundedSender;

use crate::sse::LineBuffer;
use crate::{AnswerStreamer, SHARED_HTTP};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

/// Streaming response: each line is one of these JSON objects.
#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// Local model client speaking Ollama's line-delimited JSON stream.
pub struct OllamaClient {
    http: Client,
    base: String,
    model: String,
}

impl OllamaClient {
    pub fn new(model: String) -> Self {
        let base =
            env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());
        Self {
            http: SHARED_HTTP.clone(),
            base: base.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base = base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl AnswerStreamer for OllamaClient {
    async fn stream_text(
        &self,
        request: StreamRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let url = format!("{}/api/chat", self.base);
        let req = OllamaChatRequest {
            model: &self.model,
            messages: vec![OllamaMessage {
                role: "user".into(),
                content: request.prompt,
            }],
            stream: true,
            options: OllamaOptions {
                num_predict: request.max_output_tokens,
            },
        };
        let resp = self.http.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("ollama error: {}", resp.status()));
        }

        let mut stream = resp.bytes_stream();
        let mut lines = LineBuffer::new();

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!("stream read error: {}", e)));
                    return Ok(());
                }
            };
            for line in lines.feed(&bytes) {
                match serde_json::from_str::<OllamaStreamChunk>(&line) {
                    Ok(chunk_data) => {
                        if let Some(error) = chunk_data.error {
                            let _ = tx.send(StreamChunk::Error(error));
                            return Ok(());
                        }
                        if let Some(msg) = &chunk_data.message {
                            if !msg.content.is_empty() {
                                let _ = tx.send(StreamChunk::Text(msg.content.clone()));
                            }
                        }
                        if chunk_data.done {
                            let _ = tx.send(StreamChunk::Done {
                                stop_reason: chunk_data.done_reason,
                            });
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(StreamChunk::Error(format!(
                            "Failed to parse Ollama stream: {}",
                            e
                        )));
                        return Ok(());
                    }
                }
            }
        }

        let _ = tx.send(StreamChunk::Done { stop_reason: None });
        Ok(())
    }
}
