//! Chat client trait and message types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The model every persona talks to.
pub const MODEL_ID: &str = "microsoft/Phi-3-mini-4k-instruct";

// ─────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────

/// One chat message, as kept in memory and sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,

    /// Speaker name, for messages relayed from other agents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
}

impl FinishReason {
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

/// Token accounting reported by the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A model reply
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: TokenUsage,
}

// ─────────────────────────────────────────────────────────────────
// Client trait
// ─────────────────────────────────────────────────────────────────

/// A chat-completion client bound to one model.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Model identifier this client is bound to
    fn model(&self) -> &str;

    /// Generate a reply for the given conversation
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatCompletion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_omitted_when_absent() {
        let json = serde_json::to_value(ChatMessage::user("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hello"}));

        let json = serde_json::to_value(ChatMessage::user("hi").with_name("Gimli")).unwrap();
        assert_eq!(json["name"], "Gimli");
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_api(Some("length")), FinishReason::Length);
        assert_eq!(FinishReason::from_api(Some("eos_token")), FinishReason::Stop);
        assert_eq!(FinishReason::from_api(None), FinishReason::Stop);
    }
}
