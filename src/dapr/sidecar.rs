//! The sidecar seam: state and pub/sub operations the agent needs

use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::types::{CloudEvent, StateEntry};

/// State and pub/sub building blocks exposed by a Dapr sidecar.
#[async_trait]
pub trait Sidecar: Send + Sync {
    /// Human-readable location, for logs and errors
    fn endpoint(&self) -> &str;

    /// Succeeds once the sidecar can reach its components
    async fn health(&self) -> Result<()>;

    /// Read a key; `None` when absent
    async fn get_state(&self, store: &str, key: &str) -> Result<Option<StateEntry>>;

    /// Write a key. With an etag the write only succeeds if the stored
    /// value is unchanged, otherwise `Error::StateConflict`.
    async fn save_state(&self, store: &str, key: &str, value: &Value, etag: Option<&str>) -> Result<()>;

    /// Write a key that must not exist yet, otherwise `Error::StateConflict`.
    async fn create_state(&self, store: &str, key: &str, value: &Value) -> Result<()>;

    /// Publish a CloudEvent on a topic
    async fn publish(&self, pubsub: &str, topic: &str, event: &CloudEvent) -> Result<()>;
}

/// Poll `health` with exponential backoff until it succeeds or `max_wait` elapses.
pub async fn wait_until_ready(sidecar: &dyn Sidecar, max_wait: Duration) -> Result<()> {
    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_millis(250),
        max_interval: Duration::from_secs(5),
        max_elapsed_time: Some(max_wait),
        ..Default::default()
    };

    loop {
        match sidecar.health().await {
            Ok(()) => {
                info!(endpoint = %sidecar.endpoint(), "Dapr sidecar is ready");
                return Ok(());
            }
            Err(e) => match backoff.next_backoff() {
                Some(delay) => {
                    debug!(error = %e, ?delay, "Sidecar not ready yet");
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(Error::SidecarUnavailable {
                        url: sidecar.endpoint().to_string(),
                        message: format!("not healthy after {}s: {}", max_wait.as_secs(), e),
                    });
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dapr::InMemorySidecar;

    #[tokio::test]
    async fn test_ready_sidecar_returns_immediately() {
        let sidecar = InMemorySidecar::new();
        wait_until_ready(&sidecar, Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_unhealthy_sidecar_times_out() {
        let sidecar = InMemorySidecar::new();
        sidecar.set_healthy(false);

        let err = wait_until_ready(&sidecar, Duration::from_millis(300)).await.unwrap_err();
        assert!(matches!(err, Error::SidecarUnavailable { .. }));
    }
}
