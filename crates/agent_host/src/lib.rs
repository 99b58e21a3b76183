//! Research Host - battery science question answering with paper references
//!
//! This crate provides the core of one question/answer turn:
//! - Fan out domain-scoped paper searches and rank the references found
//! - Stream the model's answer into an assistant message
//! - Join both onto the finalized message, degrading gracefully on failure

pub mod conversation;
pub mod prompts;
pub mod research;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use providers::{AnswerStreamer, ProviderRouter};
use services::SearchProvider;
use shared::agent_api::{StreamChunk, StreamRequest};
use shared::chat::{Message, PaperSearchResult};
use shared::events::TurnEvent;
use shared::search_types::SearchOptions;
use shared::settings::{AnswerSettings, AppSettings};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

pub use conversation::{reduce, ConversationLog};
pub use prompts::build_answer_prompt;

/// Replaces the whole answer when the stream fails at any point.
pub const APOLOGY: &str =
    "I apologize, but I encountered an error while processing your request. Please try again.";

/// Runs question turns against a search backend and an answer provider.
pub struct ResearchHost {
    search: Arc<dyn SearchProvider>,
    streamer: Arc<dyn AnswerStreamer>,
    answer: AnswerSettings,
    search_options: SearchOptions,
}

impl ResearchHost {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        streamer: Arc<dyn AnswerStreamer>,
        answer: AnswerSettings,
        search_options: SearchOptions,
    ) -> Self {
        Self {
            search,
            streamer,
            answer,
            search_options,
        }
    }

    /// Wire up the configured search backend and answer provider.
    pub fn from_settings(settings: &AppSettings) -> Result<Self> {
        let search = services::build_search_provider(&settings.search)
            .map_err(|e| anyhow!("search backend: {}", e))?;
        let streamer = Arc::new(ProviderRouter::new(settings.model.clone()));
        let search_options = SearchOptions {
            limit: settings.search.result_limit,
            ..SearchOptions::default()
        };
        Ok(Self::new(
            search,
            streamer,
            settings.answer.clone(),
            search_options,
        ))
    }

    /// Start a turn in the background. Progress arrives on `sink`.
    ///
    /// Precondition: at most one turn per conversation is in flight. The
    /// caller is responsible for not submitting again until the previous
    /// turn's `Finalized` event has arrived.
    pub fn submit_question(
        self: &Arc<Self>,
        text: impl Into<String>,
        sink: UnboundedSender<TurnEvent>,
    ) -> JoinHandle<()> {
        let host = Arc::clone(self);
        let text = text.into();
        tokio::spawn(async move {
            host.run_turn(&text, &sink).await;
        })
    }

    /// Run one full turn, emitting events on `sink`.
    ///
    /// Emits the user message, an empty streaming assistant message, one
    /// content update per stream chunk and exactly one `Finalized` event.
    /// Returns the finalized event.
    pub async fn run_turn(&self, text: &str, sink: &UnboundedSender<TurnEvent>) -> TurnEvent {
        let emit = |event: TurnEvent| {
            // A closed sink only means nobody is watching any more.
            let _ = sink.send(event);
        };

        emit(TurnEvent::UserMessage(Message::user(text)));
        let assistant = Message::assistant_placeholder();
        let id = assistant.id.clone();
        emit(TurnEvent::AssistantStarted(assistant));
        tracing::info!(message_id = %id, "turn started");

        let (papers, answer) = tokio::join!(
            self.collect_references(text),
            self.stream_answer(text, &id, sink)
        );

        let finalized = match answer {
            Ok(content) => {
                tracing::info!(
                    message_id = %id,
                    references = papers.papers.len(),
                    "turn complete"
                );
                TurnEvent::Finalized {
                    id,
                    content,
                    references: papers.papers,
                }
            }
            Err(err) => {
                tracing::error!(message_id = %id, error = %err, "answer stream failed");
                TurnEvent::Finalized {
                    id,
                    content: APOLOGY.to_string(),
                    references: Vec::new(),
                }
            }
        };
        emit(finalized.clone());
        finalized
    }

    /// Fan out the paper queries and rank what comes back. Never fails.
    pub async fn collect_references(&self, question: &str) -> PaperSearchResult {
        let queries = research::build_queries(question);
        let settled =
            research::fan_out(Arc::clone(&self.search), &queries, &self.search_options).await;
        let result_sets: Vec<research::RawResultSet> =
            settled.into_iter().map(Into::into).collect();
        let result = research::extract_references_or_empty(&result_sets, question);
        tracing::debug!(
            found = result.total_found,
            kept = result.papers.len(),
            "references ranked"
        );
        result
    }

    /// Stream the answer, publishing the accumulated content after each chunk.
    ///
    /// Any provider error, before or during streaming, fails the whole answer.
    async fn stream_answer(
        &self,
        question: &str,
        id: &str,
        sink: &UnboundedSender<TurnEvent>,
    ) -> Result<String> {
        let request = StreamRequest {
            prompt: build_answer_prompt(question),
            enable_web_search: self.answer.enable_web_search,
            max_output_tokens: self.answer.max_output_tokens,
        };
        let (tx, mut rx) = mpsc::unbounded_channel();

        let produce = self.streamer.stream_text(request, tx);
        let consume = async {
            let mut content = String::new();
            let mut failure: Option<String> = None;
            while let Some(chunk) = rx.recv().await {
                match chunk {
                    StreamChunk::Text(text) if failure.is_none() => {
                        content.push_str(&text);
                        let _ = sink.send(TurnEvent::ContentUpdated {
                            id: id.to_string(),
                            content: content.clone(),
                        });
                    }
                    StreamChunk::Error(err) => {
                        failure.get_or_insert(err);
                    }
                    _ => {}
                }
            }
            (content, failure)
        };

        let (produced, (content, failure)) = tokio::join!(produce, consume);
        produced?;
        if let Some(err) = failure {
            return Err(anyhow!(err));
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use services::SearchError;
    use shared::chat::Role;
    use shared::search_types::{RawResultItem, SearchResponse};

    /// Answers each query by the domain group it targets.
    struct FakeSearch {
        fail_all: bool,
        arxiv: Vec<RawResultItem>,
        journals: Vec<RawResultItem>,
    }

    impl FakeSearch {
        fn empty() -> Self {
            Self {
                fail_all: false,
                arxiv: Vec::new(),
                journals: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for FakeSearch {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn search(
            &self,
            query: &str,
            _options: &SearchOptions,
        ) -> services::Result<SearchResponse> {
            if self.fail_all {
                return Err(SearchError::Http("connection reset".into()));
            }
            let items = if query.ends_with("site:arxiv.org") {
                self.arxiv.clone()
            } else if query.contains("site:nature.com") {
                self.journals.clone()
            } else {
                Vec::new()
            };
            Ok(SearchResponse {
                organic_results: Some(items),
            })
        }
    }

    /// Replays scripted chunks, optionally refusing to connect.
    struct FakeStreamer {
        connect_error: bool,
        chunks: Vec<StreamChunk>,
    }

    #[async_trait]
    impl AnswerStreamer for FakeStreamer {
        async fn stream_text(
            &self,
            _request: StreamRequest,
            tx: UnboundedSender<StreamChunk>,
        ) -> Result<()> {
            if self.connect_error {
                return Err(anyhow!("connection refused"));
            }
            for chunk in &self.chunks {
                let _ = tx.send(chunk.clone());
                tokio::task::yield_now().await;
            }
            Ok(())
        }
    }

    fn host(search: FakeSearch, streamer: FakeStreamer) -> ResearchHost {
        ResearchHost::new(
            Arc::new(search),
            Arc::new(streamer),
            AnswerSettings::default(),
            SearchOptions::default(),
        )
    }

    fn text(s: &str) -> StreamChunk {
        StreamChunk::Text(s.to_string())
    }

    async fn run(host: &ResearchHost, question: &str) -> Vec<TurnEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        host.run_turn(question, &tx).await;
        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_stream_success_with_references() {
        let search = FakeSearch {
            fail_all: false,
            arxiv: vec![RawResultItem::new(
                "Nernst equation in porous electrodes",
                "https://arxiv.org/abs/2104.00001",
                Some("Newman et al. reported in 2021 that..."),
            )],
            journals: vec![RawResultItem::new(
                "Thermodynamics of intercalation",
                "https://www.nature.com/articles/s41560-022-1",
                None,
            )],
        };
        let streamer = FakeStreamer {
            connect_error: false,
            chunks: vec![
                text("The Nernst "),
                text("equation is..."),
                StreamChunk::Done { stop_reason: None },
            ],
        };

        let events = run(&host(search, streamer), "The Nernst equation").await;
        let messages = reduce(&events);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "The Nernst equation");

        let answer = &messages[1];
        assert_eq!(answer.role, Role::Assistant);
        assert_eq!(answer.content, "The Nernst equation is...");
        assert!(!answer.is_streaming);

        let references = answer.references.as_ref().unwrap();
        assert_eq!(references.len(), 2);
        assert!(references[0].relevance_score >= references[1].relevance_score);
        // Top-tier host plus "the" in "Thermodynamics"
        assert_eq!(references[0].journal, "Nature");
        assert_eq!(references[0].relevance_score, 0.99);
        assert_eq!(references[1].year, 2021);
    }

    #[tokio::test]
    async fn test_event_sequence() {
        let streamer = FakeStreamer {
            connect_error: false,
            chunks: vec![text("a"), text("b")],
        };
        let events = run(&host(FakeSearch::empty(), streamer), "q").await;

        assert!(matches!(events[0], TurnEvent::UserMessage(_)));
        assert!(matches!(
            &events[1],
            TurnEvent::AssistantStarted(m) if m.is_streaming && m.content.is_empty()
        ));
        assert_eq!(
            events[2],
            TurnEvent::ContentUpdated {
                id: events[1].message_id().to_string(),
                content: "a".into()
            }
        );
        assert!(matches!(&events[3], TurnEvent::ContentUpdated { content, .. } if content == "ab"));
        assert_eq!(events.len(), 5);
        assert_eq!(events.iter().filter(|e| e.is_final()).count(), 1);
        assert!(events[4].is_final());
    }

    #[tokio::test]
    async fn test_stream_failure_replaces_partial_content() {
        let search = FakeSearch {
            fail_all: false,
            arxiv: vec![RawResultItem::new(
                "Lithium metal anodes",
                "https://arxiv.org/abs/1",
                None,
            )],
            journals: Vec::new(),
        };
        let streamer = FakeStreamer {
            connect_error: false,
            chunks: vec![text("Lith"), text("ium"), StreamChunk::Error("reset".into())],
        };

        let events = run(&host(search, streamer), "Lithium anodes").await;
        let messages = reduce(&events);

        assert_eq!(messages[1].content, APOLOGY);
        assert_ne!(messages[1].content, "Lithium");
        assert!(messages[1].references.is_none());
        assert!(!messages[1].is_streaming);
    }

    #[tokio::test]
    async fn test_connect_failure_is_apology() {
        let streamer = FakeStreamer {
            connect_error: true,
            chunks: Vec::new(),
        };
        let events = run(&host(FakeSearch::empty(), streamer), "q").await;
        let messages = reduce(&events);
        assert_eq!(messages[1].content, APOLOGY);
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn test_all_searches_fail_answer_still_delivered() {
        let search = FakeSearch {
            fail_all: true,
            arxiv: Vec::new(),
            journals: Vec::new(),
        };
        let streamer = FakeStreamer {
            connect_error: false,
            chunks: vec![text("Sodium-ion cells "), text("trade density for cost.")],
        };

        let events = run(&host(search, streamer), "sodium-ion").await;
        let messages = reduce(&events);

        assert_eq!(messages[1].content, "Sodium-ion cells trade density for cost.");
        assert!(messages[1].references.is_none());
        assert!(!messages[1].is_streaming);
    }

    #[tokio::test]
    async fn test_submit_question_runs_in_background() {
        let streamer = FakeStreamer {
            connect_error: false,
            chunks: vec![text("ok")],
        };
        let host = Arc::new(host(FakeSearch::empty(), streamer));
        let log = ConversationLog::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = host.submit_question("ping", tx);
        while let Some(event) = rx.recv().await {
            log.append(event);
        }
        handle.await.unwrap();

        let messages = log.snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "ok");
    }
}
