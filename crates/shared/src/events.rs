//! Turn events emitted while answering a question.
//!
//! The conversation is an append-only log of these events; the current message
//! list is derived from it by a reducer.

use serde::{Deserialize, Serialize};

use crate::chat::{Message, Reference};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TurnEvent {
    /// The user's question, appended immediately
    UserMessage(Message),
    /// Empty streaming assistant message
    AssistantStarted(Message),
    /// Full accumulated content after a stream chunk
    ContentUpdated { id: String, content: String },
    /// Emitted exactly once per turn
    Finalized {
        id: String,
        content: String,
        references: Vec<Reference>,
    },
}

impl TurnEvent {
    /// Id of the message this event targets
    pub fn message_id(&self) -> &str {
        match self {
            TurnEvent::UserMessage(msg) => &msg.id,
            TurnEvent::AssistantStarted(msg) => &msg.id,
            TurnEvent::ContentUpdated { id, .. } => id,
            TurnEvent::Finalized { id, .. } => id,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, TurnEvent::Finalized { .. })
    }
}
