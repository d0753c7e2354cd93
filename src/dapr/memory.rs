//! In-process sidecar for tests
//!
//! Keeps versioned state per `(store, key)` and records every publication.
//! Etags are the stringified version counter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Error, Result};

use super::sidecar::Sidecar;
use super::types::{CloudEvent, StateEntry};

/// A recorded publication
#[derive(Debug, Clone)]
pub struct Published {
    pub pubsub: String,
    pub topic: String,
    pub event: CloudEvent,
}

pub struct InMemorySidecar {
    state: Mutex<HashMap<(String, String), (Value, u64)>>,
    published: Mutex<Vec<Published>>,
    healthy: AtomicBool,
    forced_conflicts: AtomicUsize,
    failing_publishes: AtomicUsize,
}

impl Default for InMemorySidecar {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySidecar {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            published: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
            forced_conflicts: AtomicUsize::new(0),
            failing_publishes: AtomicUsize::new(0),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Fail the next `n` guarded writes with a conflict
    pub fn force_conflicts(&self, n: usize) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` publishes as if the sidecar were unreachable
    pub fn fail_publishes(&self, n: usize) {
        self.failing_publishes.store(n, Ordering::SeqCst);
    }

    /// Current value of a key
    pub fn state(&self, store: &str, key: &str) -> Option<Value> {
        self.state
            .lock()
            .get(&(store.to_string(), key.to_string()))
            .map(|(value, _)| value.clone())
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    pub fn published_to(&self, topic: &str) -> Vec<Published> {
        self.published
            .lock()
            .iter()
            .filter(|p| p.topic == topic)
            .cloned()
            .collect()
    }

    fn take_forced_conflict(&self) -> bool {
        take_one(&self.forced_conflicts)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl Sidecar for InMemorySidecar {
    fn endpoint(&self) -> &str {
        "memory://sidecar"
    }

    async fn health(&self) -> Result<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::connection_failed(self.endpoint(), "sidecar marked unhealthy"))
        }
    }

    async fn get_state(&self, store: &str, key: &str) -> Result<Option<StateEntry>> {
        Ok(self
            .state
            .lock()
            .get(&(store.to_string(), key.to_string()))
            .map(|(value, version)| StateEntry {
                value: value.clone(),
                etag: Some(version.to_string()),
            }))
    }

    async fn save_state(&self, store: &str, key: &str, value: &Value, etag: Option<&str>) -> Result<()> {
        let conflict = || Error::StateConflict {
            store: store.to_string(),
            key: key.to_string(),
        };

        if etag.is_some() && self.take_forced_conflict() {
            return Err(conflict());
        }

        let mut state = self.state.lock();
        let slot = (store.to_string(), key.to_string());
        let current = state.get(&slot).map(|(_, version)| *version);

        if let Some(expected) = etag {
            match current {
                Some(version) if version.to_string() == expected => {}
                _ => return Err(conflict()),
            }
        }

        let next = current.unwrap_or(0) + 1;
        state.insert(slot, (value.clone(), next));
        Ok(())
    }

    async fn create_state(&self, store: &str, key: &str, value: &Value) -> Result<()> {
        let slot = (store.to_string(), key.to_string());
        let mut state = self.state.lock();
        if self.take_forced_conflict() || state.contains_key(&slot) {
            return Err(Error::StateConflict {
                store: store.to_string(),
                key: key.to_string(),
            });
        }
        state.insert(slot, (value.clone(), 1));
        Ok(())
    }

    async fn publish(&self, pubsub: &str, topic: &str, event: &CloudEvent) -> Result<()> {
        if take_one(&self.failing_publishes) {
            return Err(Error::connection_failed(self.endpoint(), "publish refused"));
        }
        self.published.lock().push(Published {
            pubsub: pubsub.to_string(),
            topic: topic.to_string(),
            event: event.clone(),
        });
        Ok(())
    }
}
