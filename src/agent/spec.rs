//! What an agent is built from: a persona and its infrastructure bindings

use serde::{Deserialize, Serialize};

use crate::persona::PersonaConfig;

/// Names of the Dapr components and keys an agent is wired to.
///
/// These are resolved by the sidecar's component configuration, so the
/// defaults here must match the deployed component names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraBindings {
    /// Pub/sub component for agent messages
    pub message_bus_name: String,

    /// State store holding workflow state
    pub state_store_name: String,

    /// Key of the workflow state document
    pub state_key: String,

    /// State store holding the agent registry
    pub agents_registry_store_name: String,

    /// Key of the registry document
    pub agents_registry_key: String,

    /// Topic every agent listens on
    pub broadcast_topic_name: String,
}

impl Default for InfraBindings {
    fn default() -> Self {
        Self {
            message_bus_name: "messagepubsub".to_string(),
            state_store_name: "workflowstatestore".to_string(),
            state_key: "workflow_state".to_string(),
            agents_registry_store_name: "agentstatestore".to_string(),
            agents_registry_key: "agents_registry".to_string(),
            broadcast_topic_name: "beacon_channel".to_string(),
        }
    }
}

/// Everything needed to construct one assistant agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub persona: PersonaConfig,
    pub bindings: InfraBindings,
}

impl AgentSpec {
    /// Persona with the standard bindings
    pub fn new(persona: PersonaConfig) -> Self {
        Self {
            persona,
            bindings: InfraBindings::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.persona.name
    }

    /// The agent's own topic is its name
    pub fn topic_name(&self) -> &str {
        &self.persona.name
    }
}
