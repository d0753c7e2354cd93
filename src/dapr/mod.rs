//! Dapr sidecar access
//!
//! `Sidecar` is the seam; `DaprClient` talks to a real sidecar over HTTP and
//! `InMemorySidecar` stands in for one in tests.

mod client;
mod memory;
mod sidecar;
mod types;

pub use client::DaprClient;
pub use memory::{InMemorySidecar, Published};
pub use sidecar::{wait_until_ready, Sidecar};
pub use types::{
    CloudEvent, DeliveryResponse, DeliveryStatus, StateEntry, Subscription,
    CLOUDEVENTS_CONTENT_TYPE, CLOUDEVENTS_SPEC_VERSION,
};
