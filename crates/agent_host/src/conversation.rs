//! Conversation state as an append-only event log plus a pure reducer.

use parking_lot::Mutex;
use shared::chat::Message;
use shared::events::TurnEvent;

/// Apply one event to a message list.
///
/// User messages never change after they are appended. Assistant messages take
/// content updates only while streaming, and are finalized at most once.
/// Events for unknown ids are ignored.
pub fn apply(messages: &mut Vec<Message>, event: &TurnEvent) {
    match event {
        TurnEvent::UserMessage(msg) | TurnEvent::AssistantStarted(msg) => {
            if !messages.iter().any(|m| m.id == msg.id) {
                messages.push(msg.clone());
            }
        }
        TurnEvent::ContentUpdated { id, content } => {
            if let Some(msg) = streaming_message(messages, id) {
                msg.content.clone_from(content);
            }
        }
        TurnEvent::Finalized {
            id,
            content,
            references,
        } => {
            if let Some(msg) = streaming_message(messages, id) {
                msg.content.clone_from(content);
                msg.references = if references.is_empty() {
                    None
                } else {
                    Some(references.clone())
                };
                msg.is_streaming = false;
            }
        }
    }
}

fn streaming_message<'a>(messages: &'a mut [Message], id: &str) -> Option<&'a mut Message> {
    messages.iter_mut().find(|m| m.id == id && m.is_streaming)
}

/// Fold a whole event log into the current message list.
pub fn reduce(events: &[TurnEvent]) -> Vec<Message> {
    let mut messages = Vec::new();
    for event in events {
        apply(&mut messages, event);
    }
    messages
}

/// Shared, append-only record of every turn event in one conversation.
#[derive(Default)]
pub struct ConversationLog {
    events: Mutex<Vec<TurnEvent>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, event: TurnEvent) {
        self.events.lock().push(event);
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn events(&self) -> Vec<TurnEvent> {
        self.events.lock().clone()
    }

    /// Current message list derived from the log.
    pub fn snapshot(&self) -> Vec<Message> {
        reduce(&self.events.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::chat::{Reference, Role};

    fn reference(id: &str) -> Reference {
        Reference {
            id: id.into(),
            title: format!("Paper {id}"),
            authors: vec!["Various Authors".into()],
            journal: "arXiv".into(),
            year: 2022,
            doi: None,
            url: "https://arxiv.org/abs/1".into(),
            relevance_score: 0.7,
            abstract_text: "Abstract not available".into(),
        }
    }

    fn started_turn() -> (Vec<TurnEvent>, String) {
        let user = Message::user("What is SEI?");
        let assistant = Message::assistant_placeholder();
        let id = assistant.id.clone();
        (
            vec![TurnEvent::UserMessage(user), TurnEvent::AssistantStarted(assistant)],
            id,
        )
    }

    #[test]
    fn test_reduce_streaming_then_finalize() {
        let (mut events, id) = started_turn();
        events.push(TurnEvent::ContentUpdated {
            id: id.clone(),
            content: "The solid".into(),
        });
        events.push(TurnEvent::ContentUpdated {
            id: id.clone(),
            content: "The solid electrolyte interphase".into(),
        });

        let mid = reduce(&events);
        assert_eq!(mid.len(), 2);
        assert_eq!(mid[1].content, "The solid electrolyte interphase");
        assert!(mid[1].is_streaming);

        events.push(TurnEvent::Finalized {
            id: id.clone(),
            content: "The solid electrolyte interphase.".into(),
            references: vec![reference("0-0")],
        });
        let done = reduce(&events);
        assert_eq!(done[0].role, Role::User);
        assert_eq!(done[1].content, "The solid electrolyte interphase.");
        assert!(!done[1].is_streaming);
        assert_eq!(done[1].references.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_empty_references_are_omitted() {
        let (mut events, id) = started_turn();
        events.push(TurnEvent::Finalized {
            id,
            content: "answer".into(),
            references: Vec::new(),
        });
        let messages = reduce(&events);
        assert!(messages[1].references.is_none());
    }

    #[test]
    fn test_finalize_applies_once() {
        let (mut events, id) = started_turn();
        events.push(TurnEvent::Finalized {
            id: id.clone(),
            content: "first".into(),
            references: Vec::new(),
        });
        events.push(TurnEvent::Finalized {
            id: id.clone(),
            content: "second".into(),
            references: vec![reference("1-0")],
        });
        events.push(TurnEvent::ContentUpdated {
            id,
            content: "late chunk".into(),
        });

        let messages = reduce(&events);
        assert_eq!(messages[1].content, "first");
        assert!(messages[1].references.is_none());
    }

    #[test]
    fn test_user_message_is_immutable() {
        let (mut events, _) = started_turn();
        let user_id = events[0].message_id().to_string();
        events.push(TurnEvent::ContentUpdated {
            id: user_id,
            content: "edited".into(),
        });
        assert_eq!(reduce(&events)[0].content, "What is SEI?");
    }

    #[test]
    fn test_unknown_id_ignored() {
        let (mut events, _) = started_turn();
        events.push(TurnEvent::ContentUpdated {
            id: "missing".into(),
            content: "x".into(),
        });
        assert_eq!(reduce(&events).len(), 2);
    }

    #[test]
    fn test_log_snapshot() {
        let log = ConversationLog::new();
        assert!(log.is_empty());
        let (events, _) = started_turn();
        for event in events {
            log.append(event);
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.snapshot().len(), 2);
        assert_eq!(log.events().len(), 2);
    }
}
