pub mod chat;
pub mod events;

pub mod settings {
    use serde::{Deserialize, Serialize};

    fn default_true() -> bool {
        true
    }

    fn default_max_output_tokens() -> u32 {
        1500
    }

    fn default_result_limit() -> usize {
        5
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct ProviderAuth {
        pub api_key: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ModelProvider {
        pub provider: String,        // "openai" | "anthropic" | "local"
        pub local_model: String,     // e.g., "llama3.2:3b" for Ollama
        pub openai_model: String,    // e.g., "gpt-4o-mini"
        pub anthropic_model: String, // e.g., "claude-3-5-sonnet-20241022"
        pub openai_base_url: Option<String>,

        pub openai_auth: ProviderAuth,
        pub anthropic_auth: ProviderAuth,
    }

    impl Default for ModelProvider {
        fn default() -> Self {
            Self {
                provider: "openai".into(),
                local_model: "llama3.2:3b".into(),
                openai_model: "gpt-4o-mini".into(),
                anthropic_model: "claude-3-5-sonnet-20241022".into(),
                openai_base_url: None,
                openai_auth: ProviderAuth::default(),
                anthropic_auth: ProviderAuth::default(),
            }
        }
    }

    /// Paper search backend settings
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SearchSettings {
        /// "serpapi" or "duckduckgo"; picked from the API key when unset
        #[serde(default)]
        pub backend: Option<String>,
        #[serde(default)]
        pub api_key: Option<String>,
        #[serde(default)]
        pub base_url: Option<String>,
        /// Results requested per query
        #[serde(default = "default_result_limit")]
        pub result_limit: usize,
    }

    impl Default for SearchSettings {
        fn default() -> Self {
            Self {
                backend: None,
                api_key: None,
                base_url: None,
                result_limit: default_result_limit(),
            }
        }
    }

    /// Options forwarded with every answer request
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AnswerSettings {
        #[serde(default = "default_true")]
        pub enable_web_search: bool,
        #[serde(default = "default_max_output_tokens")]
        pub max_output_tokens: u32,
    }

    impl Default for AnswerSettings {
        fn default() -> Self {
            Self {
                enable_web_search: true,
                max_output_tokens: default_max_output_tokens(),
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct AppSettings {
        #[serde(default)]
        pub model: ModelProvider,
        #[serde(default)]
        pub search: SearchSettings,
        #[serde(default)]
        pub answer: AnswerSettings,
    }
}

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    /// A single answer request handed to a streaming provider.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct StreamRequest {
        pub prompt: String,
        pub enable_web_search: bool,
        pub max_output_tokens: u32,
    }

    /// Incremental output of a streaming provider.
    #[derive(Debug, Clone, PartialEq)]
    pub enum StreamChunk {
        Text(String),
        Done { stop_reason: Option<String> },
        Error(String),
    }
}

pub mod search_types {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SearchKind {
        Web,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SearchOptions {
        pub kind: SearchKind,
        pub limit: usize,
    }

    impl Default for SearchOptions {
        fn default() -> Self {
            Self {
                kind: SearchKind::Web,
                limit: 5,
            }
        }
    }

    /// One organic hit from the search backend. Nothing is guaranteed present.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct RawResultItem {
        #[serde(default)]
        pub title: Option<String>,
        #[serde(default)]
        pub link: Option<String>,
        #[serde(default)]
        pub snippet: Option<String>,
    }

    impl RawResultItem {
        pub fn new(title: &str, link: &str, snippet: Option<&str>) -> Self {
            Self {
                title: Some(title.to_string()),
                link: Some(link.to_string()),
                snippet: snippet.map(str::to_string),
            }
        }
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct SearchResponse {
        #[serde(default)]
        pub organic_results: Option<Vec<RawResultItem>>,
    }
}

#[cfg(test)]
mod tests {
    use super::search_types::SearchResponse;
    use super::settings::AppSettings;

    #[test]
    fn test_settings_partial_json_uses_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"model": {"provider": "anthropic"}}"#).unwrap();
        assert_eq!(settings.model.provider, "anthropic");
        assert_eq!(settings.model.openai_model, "gpt-4o-mini");
        assert_eq!(settings.search.result_limit, 5);
        assert!(settings.answer.enable_web_search);
        assert_eq!(settings.answer.max_output_tokens, 1500);
    }

    #[test]
    fn test_search_response_tolerates_missing_fields() {
        let resp: SearchResponse =
            serde_json::from_str(r#"{"organic_results": [{"title": "A"}, {}]}"#).unwrap();
        let items = resp.organic_results.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("A"));
        assert!(items[1].link.is_none());

        let empty: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.organic_results.is_none());
    }
}
