//! Per-agent workflow state
//!
//! Every handled trigger becomes a workflow instance. The whole document is
//! saved to the workflow state store after each change and reloaded on start.
//! Only the newest instances are kept so the document stays bounded.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dapr::Sidecar;
use crate::error::{Error, Result};
use crate::llm::ChatMessage;

/// One handled trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    #[serde(default)]
    pub input: Option<String>,

    #[serde(default)]
    pub output: Option<String>,

    /// Agent that sent the trigger
    #[serde(default)]
    pub source: Option<String>,

    /// The sender's own workflow instance, when it supplied one
    #[serde(default)]
    pub source_workflow_instance_id: Option<String>,

    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    pub start_time: DateTime<Utc>,

    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl WorkflowInstance {
    pub fn start(input: Option<String>, source: Option<String>, source_instance: Option<String>) -> Self {
        Self {
            input,
            output: None,
            source,
            source_workflow_instance_id: source_instance,
            messages: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    pub fn finish(&mut self, output: impl Into<String>) {
        self.output = Some(output.into());
        self.end_time = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(default)]
    pub instances: BTreeMap<String, WorkflowInstance>,
}

impl WorkflowState {
    /// Load from the store; absent means empty
    pub async fn load(sidecar: &dyn Sidecar, store: &str, key: &str) -> Result<Self> {
        match sidecar.get_state(store, key).await? {
            None => Ok(Self::default()),
            Some(entry) => {
                let state: Self = serde_json::from_value(entry.value).map_err(|e| {
                    Error::malformed(format!("workflow state {}/{}: {}", store, key, e))
                })?;
                debug!(instances = state.instances.len(), "Loaded workflow state");
                Ok(state)
            }
        }
    }

    pub async fn save(&self, sidecar: &dyn Sidecar, store: &str, key: &str) -> Result<()> {
        let value = serde_json::to_value(self)?;
        sidecar.save_state(store, key, &value, None).await
    }

    pub fn insert(&mut self, id: impl Into<String>, instance: WorkflowInstance) {
        self.instances.insert(id.into(), instance);
    }

    /// Drop the oldest instances until at most `max` remain. Returns how many went.
    pub fn evict_oldest(&mut self, max: usize) -> usize {
        let excess = self.instances.len().saturating_sub(max);
        if excess == 0 {
            return 0;
        }
        let mut by_age: Vec<(DateTime<Utc>, String)> = self
            .instances
            .iter()
            .map(|(id, instance)| (instance.start_time, id.clone()))
            .collect();
        by_age.sort();
        for (_, id) in by_age.into_iter().take(excess) {
            self.instances.remove(&id);
        }
        excess
    }

    pub fn get(&self, id: &str) -> Option<&WorkflowInstance> {
        self.instances.get(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
