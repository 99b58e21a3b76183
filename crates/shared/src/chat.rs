//! Conversation and bibliography types shared between the core and the shell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A paper reference attached to an assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// `"{query_index}-{position}"`, unique within one turn
    pub id: String,
    pub title: String,
    /// Never empty
    pub authors: Vec<String>,
    pub journal: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    pub url: String,
    pub relevance_score: f64,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

/// Output envelope of one extraction pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperSearchResult {
    pub papers: Vec<Reference>,
    pub query: String,
    /// Accepted references before the final truncation
    pub total_found: usize,
}

/// One conversation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(default)]
    pub is_streaming: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            references: None,
            is_streaming: false,
        }
    }

    /// Empty assistant message that will be filled by the answer stream.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            references: None,
            is_streaming: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_streaming_and_empty() {
        let msg = Message::assistant_placeholder();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_empty());
        assert!(msg.is_streaming);
        assert!(msg.references.is_none());
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::user("a");
        let b = Message::user("a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_reference_json_shape() {
        let reference = Reference {
            id: "0-0".into(),
            title: "Solid electrolytes".into(),
            authors: vec!["Various Authors".into()],
            journal: "arXiv".into(),
            year: 2021,
            doi: None,
            url: "https://arxiv.org/abs/2101.00001".into(),
            relevance_score: 0.8,
            abstract_text: "Abstract not available".into(),
        };
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["relevanceScore"], 0.8);
        assert_eq!(json["abstract"], "Abstract not available");
        assert!(json.get("doi").is_none());
    }

    #[test]
    fn test_message_omits_missing_references() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(json.get("references").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["isStreaming"], false);
    }
}
