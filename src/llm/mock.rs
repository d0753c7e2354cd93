//! Scripted chat client for tests and dry runs
//!
//! Replies are served in order; once the script is exhausted the client
//! answers with a fixed acknowledgement. Every request is recorded.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::traits::{ChatClient, ChatCompletion, ChatMessage, FinishReason, TokenUsage};

/// One scripted outcome
#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail(String),
    TimeOut,
}

pub struct MockChatClient {
    model: String,
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.script.lock().push_back(Scripted::Reply(content.into()));
        self
    }

    /// Queue a failure
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.script.lock().push_back(Scripted::Fail(message.into()));
        self
    }

    /// Queue a retryable timeout
    pub fn time_out(self) -> Self {
        self.script.lock().push_back(Scripted::TimeOut);
        self
    }

    /// All conversations sent so far
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatCompletion> {
        self.requests.lock().push(messages.to_vec());

        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Fail(message)) => Err(Error::llm_failed(&self.model, message)),
            Some(Scripted::TimeOut) => Err(Error::ConnectionTimeout {
                url: format!("mock://{}", self.model),
                timeout_secs: 0,
            }),
            Some(Scripted::Reply(content)) => Ok(completion(content)),
            None => Ok(completion("Acknowledged.".to_string())),
        }
    }
}

fn completion(content: String) -> ChatCompletion {
    ChatCompletion {
        usage: TokenUsage {
            prompt_tokens: 0,
            completion_tokens: content.split_whitespace().count() as u32,
        },
        content,
        finish_reason: FinishReason::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_order_then_default() {
        let client = MockChatClient::new("mock")
            .reply("first")
            .fail("boom");

        let msgs = [ChatMessage::user("hi")];
        assert_eq!(client.complete(&msgs).await.unwrap().content, "first");
        assert!(client.complete(&msgs).await.is_err());
        assert_eq!(client.complete(&msgs).await.unwrap().content, "Acknowledged.");
        assert_eq!(client.request_count(), 3);
    }

    #[tokio::test]
    async fn test_time_out_is_retryable() {
        let client = MockChatClient::new("mock").time_out();
        let err = client.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
