//! Single-shot semantic search over stored extractions.
//!
//! There is no local ranking, chunking, or caching: every stored
//! extraction is concatenated into one prompt with filename headers, and
//! the external completion service makes the entire relevance and answer
//! judgment in a single structured-output call.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// A file the model judged relevant to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelevantFile {
    pub filename: String,
    #[serde(rename = "matchReason")]
    pub match_reason: String,
    /// Relevance in [0, 1].
    pub score: f64,
}

/// The model's verdict for one search call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchVerdict {
    pub answer: String,
    #[serde(rename = "relevantFiles")]
    pub relevant_files: Vec<RelevantFile>,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("completion request failed: {0}")]
    Request(String),

    #[error("completion response was not valid: {0}")]
    InvalidResponse(String),
}

/// The completion-service boundary for search. A trait object in
/// `AppState` so integration tests can run against a canned backend.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Judges the prompt and returns the structured verdict.
    async fn judge(&self, prompt: &str) -> Result<SearchVerdict, SearchError>;
}

/// Builds the single search prompt: the query followed by every stored
/// extraction under a filename header.
pub fn build_search_prompt(query: &str, documents: &[(String, String)]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are a document search assistant. Using only the documents below, \
         answer the query and list which files are relevant.\n\n",
    );
    prompt.push_str(&format!("Query: {}\n\n", query));
    for (filename, text) in documents {
        prompt.push_str(&format!("=== {} ===\n{}\n\n", filename, text));
    }
    prompt
}

/// Backend for an OpenAI-compatible `/chat/completions` endpoint using
/// constrained-schema structured output.
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for API-compatible services).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn response_schema() -> Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": "search_verdict",
                "strict": true,
                "schema": {
                    "type": "object",
                    "properties": {
                        "answer": { "type": "string" },
                        "relevantFiles": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "filename": { "type": "string" },
                                    "matchReason": { "type": "string" },
                                    "score": { "type": "number", "minimum": 0, "maximum": 1 }
                                },
                                "required": ["filename", "matchReason", "score"],
                                "additionalProperties": false
                            }
                        }
                    },
                    "required": ["answer", "relevantFiles"],
                    "additionalProperties": false
                }
            }
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn judge(&self, prompt: &str) -> Result<SearchVerdict, SearchError> {
        let request = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": Self::response_schema(),
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Request(format!(
                "completion service returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                SearchError::InvalidResponse("response contained no content".to_string())
            })?;

        serde_json::from_str(&content)
            .map_err(|e| SearchError::InvalidResponse(format!("schema mismatch: {}", e)))
    }
}
