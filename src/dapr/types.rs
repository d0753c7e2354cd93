//! Wire types for the Dapr sidecar HTTP API

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub const CLOUDEVENTS_SPEC_VERSION: &str = "1.0";
pub const CLOUDEVENTS_CONTENT_TYPE: &str = "application/cloudevents+json";

fn default_spec_version() -> String {
    CLOUDEVENTS_SPEC_VERSION.to_string()
}

fn default_data_content_type() -> String {
    "application/json".to_string()
}

// ─────────────────────────────────────────────────────────────────
// CloudEvent
// ─────────────────────────────────────────────────────────────────

/// CloudEvents 1.0 envelope, as published to and delivered by Dapr pub/sub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    #[serde(default = "default_spec_version")]
    pub specversion: String,

    #[serde(default)]
    pub id: String,

    /// Name of the sending agent
    #[serde(default)]
    pub source: String,

    /// Message type (`TriggerAction`, `BroadcastMessage`, ...)
    #[serde(rename = "type", default)]
    pub event_type: String,

    #[serde(default = "default_data_content_type")]
    pub datacontenttype: String,

    /// Filled in by the sidecar on delivery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Filled in by the sidecar on delivery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubsubname: Option<String>,

    #[serde(default)]
    pub data: Value,
}

impl CloudEvent {
    /// New event with a fresh id
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: Value) -> Self {
        Self {
            specversion: default_spec_version(),
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            datacontenttype: default_data_content_type(),
            topic: None,
            pubsubname: None,
            data,
        }
    }

    /// Serialize a payload into a new event
    pub fn with_payload<T: Serialize>(
        source: impl Into<String>,
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self> {
        Ok(Self::new(source, event_type, serde_json::to_value(payload)?))
    }

    /// Decode the payload. Data delivered as a JSON-encoded string is unwrapped first.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        let decoded = match self.data {
            Value::String(ref raw) => serde_json::from_str(raw),
            ref other => serde_json::from_value(other.clone()),
        };
        decoded.map_err(|e| {
            Error::malformed(format!("{} event from '{}': {}", self.event_type, self.source, e))
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Subscriptions
// ─────────────────────────────────────────────────────────────────

/// Programmatic subscription returned from `GET /dapr/subscribe`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub pubsubname: String,
    pub topic: String,
    pub route: String,
}

/// Handler verdict returned to the sidecar for each delivered event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    Success,
    Retry,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub status: DeliveryStatus,
}

// ─────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────

/// A value read from a state store, with its concurrency token
#[derive(Debug, Clone, PartialEq)]
pub struct StateEntry {
    pub value: Value,
    pub etag: Option<String>,
}

/// Item in a `POST /v1.0/state/{store}` body
#[derive(Debug, Serialize)]
pub(crate) struct StateItem<'a> {
    pub key: &'a str,
    pub value: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<StateOptions>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StateOptions {
    pub concurrency: &'static str,
    pub consistency: &'static str,
}

impl StateOptions {
    pub fn first_write() -> Self {
        Self {
            concurrency: "first-write",
            consistency: "strong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        task: String,
    }

    #[test]
    fn test_event_type_field_name() {
        let event = CloudEvent::new("Gimli", "BroadcastMessage", json!({}));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "BroadcastMessage");
        assert_eq!(value["specversion"], "1.0");
        assert!(value.get("topic").is_none());
    }

    #[test]
    fn test_delivered_event_defaults() {
        let event: CloudEvent = serde_json::from_value(json!({
            "type": "TriggerAction",
            "source": "Orchestrator",
            "topic": "Gimli",
            "data": {"task": "Hold the gate"}
        }))
        .unwrap();

        assert_eq!(event.specversion, "1.0");
        assert_eq!(event.topic.as_deref(), Some("Gimli"));
        assert_eq!(event.data_as::<Payload>().unwrap().task, "Hold the gate");
    }

    #[test]
    fn test_string_encoded_data() {
        let event = CloudEvent::new("x", "TriggerAction", json!("{\"task\":\"scout\"}"));
        assert_eq!(event.data_as::<Payload>().unwrap().task, "scout");
    }

    #[test]
    fn test_bad_payload_is_malformed() {
        let event = CloudEvent::new("x", "TriggerAction", json!(42));
        assert!(matches!(
            event.data_as::<Payload>(),
            Err(Error::ProtocolMalformed { .. })
        ));
    }

    #[test]
    fn test_delivery_status_wire_format() {
        let json = serde_json::to_value(DeliveryResponse { status: DeliveryStatus::Success }).unwrap();
        assert_eq!(json, json!({"status": "SUCCESS"}));
    }

    #[test]
    fn test_state_item_with_etag() {
        let value = json!({"a": 1});
        let item = StateItem {
            key: "agents_registry",
            value: &value,
            etag: Some("3"),
            options: Some(StateOptions::first_write()),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["etag"], "3");
        assert_eq!(json["options"]["concurrency"], "first-write");
    }

    #[test]
    fn test_create_only_item_has_no_etag() {
        let value = json!({});
        let item = StateItem {
            key: "agents_registry",
            value: &value,
            etag: None,
            options: Some(StateOptions::first_write()),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("etag").is_none());
        assert_eq!(json["options"]["concurrency"], "first-write");
    }
}
