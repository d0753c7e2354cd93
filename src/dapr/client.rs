//! HTTP client for the Dapr sidecar
//!
//! Uses the sidecar's `/v1.0` HTTP API:
//! - `GET  /v1.0/healthz/outbound`
//! - `GET  /v1.0/state/{store}/{key}`
//! - `POST /v1.0/state/{store}`
//! - `POST /v1.0/publish/{pubsub}/{topic}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::config::DaprSettings;
use crate::error::{Error, Result};

use super::sidecar::Sidecar;
use super::types::{CloudEvent, StateEntry, StateItem, StateOptions, CLOUDEVENTS_CONTENT_TYPE};

const API_TOKEN_HEADER: &str = "dapr-api-token";

/// Client for one Dapr sidecar
pub struct DaprClient {
    base: Url,
    endpoint: String,
    api_token: Option<String>,
    timeout_secs: u64,
    client: Client,
}

impl DaprClient {
    pub fn new(settings: &DaprSettings) -> Result<Self> {
        let base = Url::parse(&settings.http_endpoint).map_err(|e| {
            Error::config_field_invalid("dapr.http_endpoint", format!("invalid URL: {}", e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: settings.http_endpoint.trim_end_matches('/').to_string(),
            base,
            api_token: settings.api_token.clone().filter(|t| !t.is_empty()),
            timeout_secs: settings.timeout_secs,
            client,
        })
    }

    /// `{endpoint}/v1.0/{segments...}`, with each segment percent-encoded
    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Internal(format!("{} cannot be used as a base URL", self.base)))?
            .pop_if_empty()
            .push("v1.0")
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self.client.request(method, url);
        match self.api_token {
            Some(ref token) => req.header(API_TOKEN_HEADER, token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder, url: &Url) -> Result<Response> {
        req.send()
            .await
            .map_err(|e| Error::from_reqwest(url.as_str(), self.timeout_secs, e))
    }

    async fn write_state(&self, store: &str, item: StateItem<'_>) -> Result<()> {
        let url = self.api_url(&["state", store])?;
        let key = item.key;
        let req = self.request(Method::POST, url.clone()).json(&[item]);
        let response = self.send(req, &url).await?;

        match response.status() {
            s if s.is_success() => {
                debug!(store, key, "State saved");
                Ok(())
            }
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => Err(Error::StateConflict {
                store: store.to_string(),
                key: key.to_string(),
            }),
            _ => Err(unexpected(&url, response).await),
        }
    }
}

async fn unexpected(url: &Url, response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::UnexpectedStatus {
        url: url.to_string(),
        status,
        body,
    }
}

#[async_trait]
impl Sidecar for DaprClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn health(&self) -> Result<()> {
        let url = self.api_url(&["healthz", "outbound"])?;
        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(unexpected(&url, response).await)
        }
    }

    async fn get_state(&self, store: &str, key: &str) -> Result<Option<StateEntry>> {
        let url = self.api_url(&["state", store, key])?;
        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                trace!(store, key, "State key absent");
                Ok(None)
            }
            s if s.is_success() => {
                let etag = response
                    .headers()
                    .get("etag")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.trim_matches('"').to_string());
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| Error::from_reqwest(url.as_str(), self.timeout_secs, e))?;
                if bytes.is_empty() {
                    return Ok(None);
                }
                let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::malformed(format!("state {}/{} is not JSON: {}", store, key, e))
                })?;
                Ok(Some(StateEntry { value, etag }))
            }
            _ => Err(unexpected(&url, response).await),
        }
    }

    async fn save_state(&self, store: &str, key: &str, value: &Value, etag: Option<&str>) -> Result<()> {
        let item = StateItem {
            key,
            value,
            etag,
            options: etag.map(|_| StateOptions::first_write()),
        };
        self.write_state(store, item).await
    }

    async fn create_state(&self, store: &str, key: &str, value: &Value) -> Result<()> {
        // First-write without an etag only succeeds while the key is absent
        let item = StateItem {
            key,
            value,
            etag: None,
            options: Some(StateOptions::first_write()),
        };
        self.write_state(store, item).await
    }

    async fn publish(&self, pubsub: &str, topic: &str, event: &CloudEvent) -> Result<()> {
        let url = self.api_url(&["publish", pubsub, topic])?;
        let body = serde_json::to_vec(event)?;
        let req = self
            .request(Method::POST, url.clone())
            .header("Content-Type", CLOUDEVENTS_CONTENT_TYPE)
            .body(body);
        let response = self.send(req, &url).await?;

        if response.status().is_success() {
            debug!(pubsub, topic, event_type = %event.event_type, "Event published");
            Ok(())
        } else {
            Err(unexpected(&url, response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> DaprClient {
        DaprClient::new(&DaprSettings {
            http_endpoint: endpoint.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_api_url_layout() {
        let c = client("http://127.0.0.1:3500");
        assert_eq!(
            c.api_url(&["state", "agentstatestore", "agents_registry"]).unwrap().as_str(),
            "http://127.0.0.1:3500/v1.0/state/agentstatestore/agents_registry"
        );
        assert_eq!(
            c.api_url(&["publish", "messagepubsub", "beacon_channel"]).unwrap().as_str(),
            "http://127.0.0.1:3500/v1.0/publish/messagepubsub/beacon_channel"
        );
    }

    #[test]
    fn test_trailing_slash_and_encoding() {
        let c = client("http://sidecar:3500/");
        assert_eq!(c.endpoint(), "http://sidecar:3500");
        assert_eq!(
            c.api_url(&["publish", "messagepubsub", "Gimli son/of Gloin"]).unwrap().as_str(),
            "http://sidecar:3500/v1.0/publish/messagepubsub/Gimli%20son%2Fof%20Gloin"
        );
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let c = DaprClient::new(&DaprSettings {
            api_token: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert!(c.api_token.is_none());
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = DaprClient::new(&DaprSettings {
            http_endpoint: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_sidecar_is_connection_error() {
        // Port 9 (discard) is closed on test hosts
        let c = DaprClient::new(&DaprSettings {
            http_endpoint: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        let err = c.health().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
