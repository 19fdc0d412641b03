use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A single turn in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub provider: String,
    pub model_id: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tokens: u32,
}

/// Driven port over an LLM chat-completion provider. The generator's
/// semantics/security/rationale phases and the query engine's synthesis
/// stage both depend only on this trait, never on a concrete provider SDK.
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}

/// Test double that echoes the last user message back, token count equal
/// to its word count. Never fails, so callers can exercise budget and
/// retry paths deterministically by wrapping this port instead.
#[derive(Debug, Default)]
pub struct EchoChatPort;

#[async_trait]
impl ChatPort for EchoChatPort {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let content = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let tokens = content.split_whitespace().count() as u32;
        Ok(ChatResponse { content, tokens })
    }
}

/// Test double that always fails with `provider_unavailable`, for exercising
/// the generator's defeat/partial-outcome paths.
#[derive(Debug, Default)]
pub struct UnavailableChatPort;

#[async_trait]
impl ChatPort for UnavailableChatPort {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        Err(CoreError::provider_unavailable("unavailable-test-double"))
    }
}
