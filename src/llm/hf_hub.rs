//! Hugging Face Hub chat client
//!
//! Talks to the hosted inference API through its OpenAI-compatible
//! `/v1/chat/completions` route for a single model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LlmSettings;
use crate::error::{Error, Result};

use super::traits::{ChatClient, ChatCompletion, ChatMessage, FinishReason, TokenUsage};

// ─────────────────────────────────────────────────────────────────
// API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: String,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(msg: &'a ChatMessage) -> Self {
        // The endpoint has no speaker field, so relayed names go inline
        let content = match msg.name {
            Some(ref name) if msg.role == "user" => format!("{}: {}", name, msg.content),
            _ => msg.content.clone(),
        };
        Self {
            role: &msg.role,
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────

/// Chat client for one model on the Hugging Face inference API
pub struct HfHubChatClient {
    model: String,
    settings: LlmSettings,
    url: String,
    client: Client,
}

impl HfHubChatClient {
    /// Create a client bound to `model`
    pub fn new(model: impl Into<String>, settings: LlmSettings) -> Result<Self> {
        let model = model.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let url = completions_url(&settings.base_url, &model);

        info!(model = %model, url = %url, "Hugging Face chat client created");

        Ok(Self {
            model,
            settings,
            url,
            client,
        })
    }

    /// Endpoint this client posts to
    pub fn url(&self) -> &str {
        &self.url
    }

    fn auth_header(&self) -> Option<String> {
        if self.settings.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.settings.api_key))
        }
    }

    fn parse_response(&self, parsed: ChatCompletionResponse) -> Result<ChatCompletion> {
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::llm_failed(&self.model, "No choices in API response"))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ChatCompletion {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

/// Delay before retry `attempt` (1-based): 500ms doubling, capped at 32s
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(500 * 2u64.pow(attempt.saturating_sub(1).min(MAX_BACKOFF_DOUBLINGS)))
}

const MAX_BACKOFF_DOUBLINGS: u32 = 6;

/// Build `{base}/{model}/v1/chat/completions`, tolerating a trailing slash
fn completions_url(base_url: &str, model: &str) -> String {
    format!("{}/{}/v1/chat/completions", base_url.trim_end_matches('/'), model)
}

#[async_trait]
impl ChatClient for HfHubChatClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatCompletion> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream: false,
        };

        let mut last_error: Option<Error> = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = retry_delay(attempt);
                debug!(attempt, ?backoff, "Retrying chat completion");
                tokio::time::sleep(backoff).await;
            }

            let mut req = self.client.post(&self.url).json(&body);
            if let Some(ref auth) = self.auth_header() {
                req = req.header("Authorization", auth);
            }

            let response = match req.send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!(attempt, error = %e, "Retryable connection error");
                    last_error = Some(Error::from_reqwest(&self.url, self.settings.timeout_secs, e));
                    continue;
                }
                Err(e) => return Err(Error::llm_failed(&self.model, format!("Request error: {}", e))),
            };

            let status = response.status();
            if status.is_success() {
                let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
                    Error::llm_failed(&self.model, format!("Failed to parse API response: {}", e))
                })?;
                let completion = self.parse_response(parsed)?;
                debug!(
                    model = %self.model,
                    tokens = completion.usage.total(),
                    "Chat completion received"
                );
                return Ok(completion);
            }

            let text = response.text().await.unwrap_or_default();
            match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(Error::AuthenticationFailed {
                        message: format!("{} rejected the token ({})", self.url, status),
                    });
                }
                s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => {
                    warn!(status = %s, attempt, "Retryable API error: {}", text);
                    last_error = Some(Error::UnexpectedStatus {
                        url: self.url.clone(),
                        status: s.as_u16(),
                        body: text,
                    });
                }
                s => {
                    return Err(Error::UnexpectedStatus {
                        url: self.url.clone(),
                        status: s.as_u16(),
                        body: text,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm_failed(&self.model, "All retry attempts exhausted")))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MODEL_ID;

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url("https://api-inference.huggingface.co/models/", MODEL_ID),
            "https://api-inference.huggingface.co/models/microsoft/Phi-3-mini-4k-instruct/v1/chat/completions"
        );
    }

    #[test]
    fn test_client_bound_to_model() {
        let client = HfHubChatClient::new(MODEL_ID, LlmSettings::default()).unwrap();
        assert_eq!(client.model(), "microsoft/Phi-3-mini-4k-instruct");
        assert!(client.url().ends_with("/v1/chat/completions"));
    }

    #[test]
    fn test_auth_header() {
        let settings = LlmSettings {
            api_key: "hf_test".to_string(),
            ..Default::default()
        };
        let client = HfHubChatClient::new(MODEL_ID, settings).unwrap();
        assert_eq!(client.auth_header(), Some("Bearer hf_test".to_string()));

        let anonymous = HfHubChatClient::new(MODEL_ID, LlmSettings::default()).unwrap();
        assert_eq!(anonymous.auth_header(), None);
    }

    #[test]
    fn test_relayed_name_goes_inline() {
        let msg = ChatMessage::user("Onward!").with_name("Aragorn");
        let wire = WireMessage::from(&msg);
        assert_eq!(wire.role, "user");
        assert_eq!(wire.content, "Aragorn: Onward!");
    }

    #[test]
    fn test_own_reply_name_not_inlined() {
        let msg = ChatMessage::assistant("And my axe!").with_name("Gimli");
        let wire = WireMessage::from(&msg);
        assert_eq!(wire.role, "assistant");
        assert_eq!(wire.content, "And my axe!");
    }

    #[test]
    fn test_retry_delay_is_capped() {
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(2), Duration::from_secs(1));
        assert_eq!(retry_delay(7), Duration::from_secs(32));
        assert_eq!(retry_delay(u32::MAX), Duration::from_secs(32));
    }

    #[test]
    fn test_parse_response() {
        let client = HfHubChatClient::new(MODEL_ID, LlmSettings::default()).unwrap();
        let parsed: ChatCompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "And my axe!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }))
        .unwrap();

        let completion = client.parse_response(parsed).unwrap();
        assert_eq!(completion.content, "And my axe!");
        assert_eq!(completion.finish_reason, FinishReason::Stop);
        assert_eq!(completion.usage.total(), 16);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let client = HfHubChatClient::new(MODEL_ID, LlmSettings::default()).unwrap();
        let parsed = ChatCompletionResponse {
            choices: vec![],
            usage: None,
        };
        assert!(matches!(
            client.parse_response(parsed),
            Err(Error::LlmRequestFailed { .. })
        ));
    }
}
