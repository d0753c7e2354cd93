//! Shared agent registry kept in a Dapr state store
//!
//! The registry is a single JSON object, keyed by agent name, stored under
//! one key. Updates are read-modify-write guarded by the entry's etag and
//! retried on conflict; the first registration creates the key with a
//! create-only write.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::dapr::Sidecar;
use crate::error::{Error, Result};

use super::spec::AgentSpec;

/// What an agent publishes about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub name: String,
    pub role: String,
    pub goal: String,
    pub topic_name: String,
    pub pubsub_name: String,
    #[serde(default)]
    pub orchestrator: bool,
}

impl AgentMetadata {
    pub fn from_spec(spec: &AgentSpec) -> Self {
        Self {
            name: spec.persona.name.clone(),
            role: spec.persona.role.clone(),
            goal: spec.persona.goal.clone(),
            topic_name: spec.topic_name().to_string(),
            pubsub_name: spec.bindings.message_bus_name.clone(),
            orchestrator: false,
        }
    }
}

pub struct AgentRegistry {
    sidecar: Arc<dyn Sidecar>,
    store: String,
    key: String,
    max_attempts: u32,
}

impl AgentRegistry {
    pub fn new(sidecar: Arc<dyn Sidecar>, spec: &AgentSpec, max_attempts: u32) -> Self {
        Self {
            sidecar,
            store: spec.bindings.agents_registry_store_name.clone(),
            key: spec.bindings.agents_registry_key.clone(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Add or replace this agent's entry
    pub async fn register(&self, metadata: &AgentMetadata) -> Result<()> {
        let entry = serde_json::to_value(metadata)?;
        self.update(&metadata.name, |agents| {
            agents.insert(metadata.name.clone(), entry.clone());
        })
        .await?;
        info!(agent = %metadata.name, store = %self.store, "Registered agent");
        Ok(())
    }

    /// Remove this agent's entry
    pub async fn deregister(&self, name: &str) -> Result<()> {
        self.update(name, |agents| {
            agents.remove(name);
        })
        .await?;
        info!(agent = %name, "Deregistered agent");
        Ok(())
    }

    /// All registered agents. Entries that do not parse are skipped.
    pub async fn agents(&self) -> Result<Vec<AgentMetadata>> {
        let (agents, _) = self.read().await?;
        Ok(agents
            .into_iter()
            .filter_map(|(name, value)| match serde_json::from_value(value) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    warn!(agent = %name, error = %e, "Skipping malformed registry entry");
                    None
                }
            })
            .collect())
    }

    async fn read(&self) -> Result<(Map<String, Value>, Version)> {
        match self.sidecar.get_state(&self.store, &self.key).await? {
            None => Ok((Map::new(), Version::Absent)),
            Some(entry) => match entry.value {
                Value::Object(map) => Ok((map, Version::from(entry.etag))),
                Value::Null => Ok((Map::new(), Version::from(entry.etag))),
                other => Err(Error::malformed(format!(
                    "registry {}/{} is not an object: {}",
                    self.store, self.key, other
                ))),
            },
        }
    }

    async fn update<F>(&self, agent: &str, mut apply: F) -> Result<()>
    where
        F: FnMut(&mut Map<String, Value>),
    {
        for attempt in 1..=self.max_attempts {
            let (mut agents, version) = self.read().await?;
            apply(&mut agents);
            let value = Value::Object(agents);

            let written = match version {
                Version::Absent => self.sidecar.create_state(&self.store, &self.key, &value).await,
                Version::Etag(ref etag) => {
                    self.sidecar
                        .save_state(&self.store, &self.key, &value, Some(etag))
                        .await
                }
                Version::Unversioned => {
                    self.sidecar
                        .save_state(&self.store, &self.key, &value, None)
                        .await
                }
            };

            match written {
                Ok(()) => return Ok(()),
                Err(Error::StateConflict { .. }) => {
                    debug!(agent, attempt, "Registry write conflicted, retrying");
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::RegistryUpdateFailed {
            agent: agent.to_string(),
            attempts: self.max_attempts,
        })
    }
}

/// How the stored registry may be overwritten
enum Version {
    Absent,
    Etag(String),
    /// Store returned no etag
    Unversioned,
}

impl From<Option<String>> for Version {
    fn from(etag: Option<String>) -> Self {
        match etag {
            Some(etag) => Version::Etag(etag),
            None => Version::Unversioned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dapr::InMemorySidecar;
    use crate::persona::{PersonaKind, PersonaRegistry};
    use serde_json::json;

    fn spec(kind: PersonaKind) -> AgentSpec {
        AgentSpec::new(PersonaRegistry::new().load(kind).unwrap())
    }

    #[tokio::test]
    async fn test_register_merges_with_existing_agents() {
        let sidecar = Arc::new(InMemorySidecar::new());
        let dwarf = spec(PersonaKind::Dwarf);
        let ranger = spec(PersonaKind::Ranger);

        AgentRegistry::new(sidecar.clone(), &dwarf, 3)
            .register(&AgentMetadata::from_spec(&dwarf))
            .await
            .unwrap();
        let registry = AgentRegistry::new(sidecar.clone(), &ranger, 3);
        registry.register(&AgentMetadata::from_spec(&ranger)).await.unwrap();

        let stored = sidecar.state("agentstatestore", "agents_registry").unwrap();
        assert_eq!(stored["Gimli"]["topic_name"], "Gimli");
        assert_eq!(stored["Aragorn"]["pubsub_name"], "messagepubsub");
        assert_eq!(registry.agents().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_conflicts_are_retried() {
        let sidecar = Arc::new(InMemorySidecar::new());
        let dwarf = spec(PersonaKind::Dwarf);
        sidecar
            .save_state("agentstatestore", "agents_registry", &json!({}), None)
            .await
            .unwrap();
        sidecar.force_conflicts(2);

        let registry = AgentRegistry::new(sidecar.clone(), &dwarf, 3);
        registry.register(&AgentMetadata::from_spec(&dwarf)).await.unwrap();
        assert!(sidecar.state("agentstatestore", "agents_registry").unwrap()["Gimli"].is_object());
    }

    /// Lets a rival agent register between our read and our write
    struct RacingSidecar {
        inner: InMemorySidecar,
        rival: parking_lot::Mutex<Option<Value>>,
    }

    impl RacingSidecar {
        async fn rival_writes(&self) {
            let rival = self.rival.lock().take();
            if let Some(value) = rival {
                self.inner
                    .save_state("agentstatestore", "agents_registry", &value, None)
                    .await
                    .unwrap();
            }
        }
    }

    #[async_trait::async_trait]
    impl Sidecar for RacingSidecar {
        fn endpoint(&self) -> &str {
            self.inner.endpoint()
        }

        async fn health(&self) -> Result<()> {
            self.inner.health().await
        }

        async fn get_state(&self, store: &str, key: &str) -> Result<Option<crate::dapr::StateEntry>> {
            self.inner.get_state(store, key).await
        }

        async fn save_state(&self, store: &str, key: &str, value: &Value, etag: Option<&str>) -> Result<()> {
            self.rival_writes().await;
            self.inner.save_state(store, key, value, etag).await
        }

        async fn create_state(&self, store: &str, key: &str, value: &Value) -> Result<()> {
            self.rival_writes().await;
            self.inner.create_state(store, key, value).await
        }

        async fn publish(&self, pubsub: &str, topic: &str, event: &crate::dapr::CloudEvent) -> Result<()> {
            self.inner.publish(pubsub, topic, event).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_registrations_both_survive() {
        let ranger = spec(PersonaKind::Ranger);
        let rival = json!({"Aragorn": AgentMetadata::from_spec(&ranger)});
        let sidecar = Arc::new(RacingSidecar {
            inner: InMemorySidecar::new(),
            rival: parking_lot::Mutex::new(Some(rival)),
        });
        let dwarf = spec(PersonaKind::Dwarf);

        AgentRegistry::new(sidecar.clone(), &dwarf, 3)
            .register(&AgentMetadata::from_spec(&dwarf))
            .await
            .unwrap();

        let stored = sidecar.inner.state("agentstatestore", "agents_registry").unwrap();
        assert_eq!(stored["Gimli"]["role"], "Dwarf");
        assert_eq!(stored["Aragorn"]["role"], "Ranger");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sidecar = Arc::new(InMemorySidecar::new());
        let dwarf = spec(PersonaKind::Dwarf);
        sidecar
            .save_state("agentstatestore", "agents_registry", &json!({}), None)
            .await
            .unwrap();
        sidecar.force_conflicts(10);

        let err = AgentRegistry::new(sidecar, &dwarf, 2)
            .register(&AgentMetadata::from_spec(&dwarf))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RegistryUpdateFailed { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_deregister_removes_only_self() {
        let sidecar = Arc::new(InMemorySidecar::new());
        sidecar
            .save_state(
                "agentstatestore",
                "agents_registry",
                &json!({"Gimli": {}, "Legolas": {}}),
                None,
            )
            .await
            .unwrap();

        AgentRegistry::new(sidecar.clone(), &spec(PersonaKind::Dwarf), 3)
            .deregister("Gimli")
            .await
            .unwrap();
        assert_eq!(
            sidecar.state("agentstatestore", "agents_registry"),
            Some(json!({"Legolas": {}}))
        );
    }

    #[tokio::test]
    async fn test_non_object_registry_is_malformed() {
        let sidecar = Arc::new(InMemorySidecar::new());
        sidecar
            .save_state("agentstatestore", "agents_registry", &json!([1, 2]), None)
            .await
            .unwrap();

        let err = AgentRegistry::new(sidecar, &spec(PersonaKind::Dwarf), 3)
            .agents()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolMalformed { .. }));
    }
}
