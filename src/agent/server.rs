//! App callback server the Dapr sidecar talks to
//!
//! - `GET  /dapr/subscribe` lists the agent's subscriptions
//! - `POST /events` receives CloudEvents for those subscriptions
//! - `GET  /status` reports agent state

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::warn;

use crate::dapr::{CloudEvent, DeliveryResponse, DeliveryStatus, Subscription};

use super::assistant::{AgentStatus, AssistantAgent};

pub const SUBSCRIBE_ROUTE: &str = "/dapr/subscribe";
pub const EVENTS_ROUTE: &str = "/events";
pub const STATUS_ROUTE: &str = "/status";

pub fn router(agent: AssistantAgent) -> Router {
    Router::new()
        .route(SUBSCRIBE_ROUTE, get(subscribe))
        .route(EVENTS_ROUTE, post(events))
        .route(STATUS_ROUTE, get(status))
        .with_state(agent)
}

async fn subscribe(State(agent): State<AssistantAgent>) -> Json<Vec<Subscription>> {
    Json(agent.subscriptions())
}

// Undecodable bodies still answer 200 with DROP.
async fn events(State(agent): State<AssistantAgent>, body: Bytes) -> Json<DeliveryResponse> {
    let status = match serde_json::from_slice::<CloudEvent>(&body) {
        Ok(event) => agent.handle_event(event).await,
        Err(e) => {
            warn!(error = %e, "Dropping undecodable event");
            DeliveryStatus::Drop
        }
    };
    Json(DeliveryResponse { status })
}

async fn status(State(agent): State<AssistantAgent>) -> Json<AgentStatus> {
    Json(agent.status())
}
