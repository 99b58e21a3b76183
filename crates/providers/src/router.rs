use crate::anthropic::AnthropicClient;
use crate::ollama::OllamaClient;
use crate::openai::OpenAIClient;
use crate::AnswerStreamer;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::agent_api::{StreamChunk, StreamRequest};
use shared::settings::ModelProvider;
use tokio::sync::mpsc::UnboundedSender;

/// Dispatches answer requests to the configured provider.
///
/// There is no fallback between providers: a failed request is reported once
/// and the turn degrades to its apology message.
pub struct ProviderRouter {
    config: ModelProvider,
}

impl ProviderRouter {
    pub fn new(config: ModelProvider) -> Self {
        Self { config }
    }

    pub fn active_provider(&self) -> &str {
        self.config.provider.as_str()
    }

    fn build(&self) -> Result<Box<dyn AnswerStreamer>> {
        match self.config.provider.as_str() {
            "local" => Ok(Box::new(OllamaClient::new(self.config.local_model.clone()))),
            "openai" => Ok(Box::new(OpenAIClient::from_auth(
                &self.config.openai_model,
                &self.config.openai_auth,
                self.config.openai_base_url.as_deref(),
            )?)),
            "anthropic" => Ok(Box::new(AnthropicClient::from_auth(
                &self.config.anthropic_model,
                &self.config.anthropic_auth,
            )?)),
            other => Err(anyhow!("Unknown provider: {}", other)),
        }
    }
}

#[async_trait]
impl AnswerStreamer for ProviderRouter {
    async fn stream_text(
        &self,
        request: StreamRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let client = self.build()?;
        tracing::debug!(provider = %self.active_provider(), "streaming answer");
        client.stream_text(request, tx).await
    }
}
