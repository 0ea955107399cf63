//! Completion-service client.
//!
//! Accepts the ordered, role-tagged turn list and returns one assistant
//! message. User turns may carry captured frames, which are sent as base64
//! data URLs in the OpenAI content-part shape. No retry layer: a failed
//! completion fails the turn.

use crate::error::AgentError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use slate_context::{ChatHistory, Role, Turn, TurnContent};

/// The boundary to the external language model.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produces the next assistant message for the given history.
    async fn complete(&self, history: &ChatHistory) -> Result<String, AgentError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiChatClient {
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
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
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

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Converts one turn into the wire message shape. Text turns become plain
/// string content; frame turns become an `image_url` content-part array.
fn turn_to_message(turn: &Turn) -> Value {
    match &turn.content {
        TurnContent::Text(text) => json!({
            "role": role_str(turn.role),
            "content": text,
        }),
        TurnContent::Frames(frames) => {
            let parts: Vec<Value> = frames
                .iter()
                .map(|frame| {
                    json!({
                        "type": "image_url",
                        "image_url": {
                            "url": format!(
                                "data:image/jpeg;base64,{}",
                                BASE64.encode(&frame.data)
                            ),
                        },
                    })
                })
                .collect();
            json!({
                "role": role_str(turn.role),
                "content": parts,
            })
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiChatClient {
    async fn complete(&self, history: &ChatHistory) -> Result<String, AgentError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: history.turns().iter().map(turn_to_message).collect(),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Completion(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Completion(format!(
                "completion service returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Completion(format!("invalid response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AgentError::Completion("response contained no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_media::VisualObservation;

    #[test]
    fn text_turn_serializes_as_plain_content() {
        let turn = Turn::text(Role::User, "what is this shape?");
        let message = turn_to_message(&turn);
        assert_eq!(message["role"], "user");
        assert_eq!(message["content"], "what is this shape?");
    }

    #[test]
    fn frame_turn_serializes_as_image_parts() {
        let turn = Turn::frames(vec![VisualObservation {
            data: vec![0xFF, 0xD8],
            width: 2,
            height: 2,
        }]);
        let message = turn_to_message(&turn);
        assert_eq!(message["role"], "user");
        let parts = message["content"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["type"], "image_url");
        let url = parts[0]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }
}
