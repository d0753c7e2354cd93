//! Assistant agent runtime
//!
//! An agent is a persona bound to an LLM and a Dapr sidecar. It registers
//! itself in the shared agent registry, listens on its own topic and the
//! broadcast topic, and keeps its conversation and workflow state.

mod assistant;
mod memory;
mod messages;
mod registry;
mod server;
mod spec;
mod workflow;

pub use assistant::{AgentStatus, AssistantAgent};
pub use memory::ConversationMemory;
pub use messages::{
    ActionResponse, BroadcastMessage, TriggerAction, ACTION_RESPONSE,
    BROADCAST_MESSAGE, TRIGGER_ACTION,
};
pub use registry::{AgentMetadata, AgentRegistry};
pub use server::{router, EVENTS_ROUTE, STATUS_ROUTE, SUBSCRIBE_ROUTE};
pub use spec::{AgentSpec, InfraBindings};
pub use workflow::{WorkflowInstance, WorkflowState};
