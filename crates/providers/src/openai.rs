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

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    stream: bool,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

// ── Streaming response types ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIStreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamError {
    error: OpenAIErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    message: String,
}

// ── Client ───────────────────────────────────────────────────────────

/// Chat-completions client for OpenAI and compatible endpoints.
pub struct OpenAIClient {
    http: Client,
    auth_token: String,
    model: String,
    base_url: String,
}

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

impl OpenAIClient {
    pub fn from_auth(model: &str, auth: &ProviderAuth, base_url: Option<&str>) -> Result<Self> {
        let auth_token = match &auth.api_key {
            Some(api_key) => api_key.clone(),
            None => env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow!("No OpenAI authentication configured"))?,
        };

        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token,
            model: model.to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn build_request(&self, request: &StreamRequest) -> OpenAIRequest {
        if request.enable_web_search {
            // Chat completions has no search switch; the prompt carries the intent.
            tracing::debug!(model = %self.model, "web search flag ignored by openai provider");
        }
        OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            stream: true,
            max_tokens: request.max_output_tokens,
        }
    }
}

#[async_trait]
impl AnswerStreamer for OpenAIClient {
    async fn stream_text(
        &self,
        request: StreamRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let req = self.build_request(&request);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(error_detail("openai", status, &body)));
        }

        let mut parser = SseParser::new();
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!("stream read error: {}", e)));
                    return Ok(());
                }
            };
            for event in parser.feed(&bytes) {
                if event.is_done() {
                    let _ = tx.send(StreamChunk::Done { stop_reason: None });
                    return Ok(());
                }
                if let Ok(err) = serde_json::from_str::<OpenAIStreamError>(&event.data) {
                    let _ = tx.send(StreamChunk::Error(err.error.message));
                    return Ok(());
                }
                match serde_json::from_str::<OpenAIStreamResponse>(&event.data) {
                    Ok(resp) => {
                        if let Some(choice) = resp.choices.first() {
                            if let Some(content) = &choice.delta.content {
                                if !content.is_empty() {
                                    let _ = tx.send(StreamChunk::Text(content.clone()));
                                }
                            }
                            if let Some(reason) = &choice.finish_reason {
                                let _ = tx.send(StreamChunk::Done {
                                    stop_reason: Some(reason.clone()),
                                });
                                return Ok(());
                            }
                        }
                    }
                    Err(_) => {
                        // Skip unparseable SSE lines (e.g. comments)
                    }
                }
            }
        }

        let _ = tx.send(StreamChunk::Done { stop_reason: None });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> OpenAIClient {
        let auth = ProviderAuth {
            api_key: Some("test-key".into()),
        };
        OpenAIClient::from_auth("gpt-4o-mini", &auth, Some(base)).unwrap()
    }

    fn request() -> StreamRequest {
        StreamRequest {
            prompt: "What is the Nernst equation?".into(),
            enable_web_search: true,
            max_output_tokens: 1500,
        }
    }

    #[test]
    fn test_request_carries_token_limit() {
        let c = client("http://localhost/");
        let req = c.build_request(&request());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["max_tokens"], 1500);
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(c.base_url, "http://localhost");
    }

    #[tokio::test]
    async fn test_stream_text_emits_chunks_in_order() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"The Nernst \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"equation is...\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        client(&server.uri()).stream_text(request(), tx).await.unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Text("The Nernst ".into()),
                StreamChunk::Text("equation is...".into()),
                StreamChunk::Done { stop_reason: None },
            ]
        );
    }

    #[tokio::test]
    async fn test_http_error_before_streaming_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = client(&server.uri())
            .stream_text(request(), tx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_mid_stream_error_is_chunk() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Lith\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"overloaded\"}}\n\n",
        );
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        client(&server.uri()).stream_text(request(), tx).await.unwrap();

        assert_eq!(rx.recv().await, Some(StreamChunk::Text("Lith".into())));
        assert_eq!(rx.recv().await, Some(StreamChunk::Error("overloaded".into())));
        assert_eq!(rx.recv().await, None);
    }
}
