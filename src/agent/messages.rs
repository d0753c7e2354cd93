//! Messages agents exchange over pub/sub
//!
//! Each message travels as the `data` of a CloudEvent whose `type` is the
//! message name.

use serde::{Deserialize, Serialize};

pub const TRIGGER_ACTION: &str = "TriggerAction";
pub const ACTION_RESPONSE: &str = "ActionResponse";
pub const BROADCAST_MESSAGE: &str = "BroadcastMessage";

/// Request for the agent to act, usually from an orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_instance_id: Option<String>,
}

/// Reply sent back to whoever triggered the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub name: String,
    pub role: String,
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_instance_id: Option<String>,
}

/// Message shared with every agent on the broadcast topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub name: String,
    pub role: String,
    pub content: String,
}
