//! The assistant agent: a persona answering over Dapr pub/sub
//!
//! Lifecycle of `start`:
//! 1. Wait for the sidecar to report healthy
//! 2. Load workflow state
//! 3. Register metadata in the agent registry
//! 4. Bind the app callback server and report ready
//! 5. Serve until the shutdown signal, then deregister

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::dapr::{wait_until_ready, CloudEvent, DeliveryStatus, Sidecar, Subscription};
use crate::error::{Error, Result};
use crate::llm::{ChatClient, ChatMessage};

use super::memory::ConversationMemory;
use super::messages::{
    ActionResponse, BroadcastMessage, TriggerAction, ACTION_RESPONSE, BROADCAST_MESSAGE,
    TRIGGER_ACTION,
};
use super::registry::{AgentMetadata, AgentRegistry};
use super::server::{self, EVENTS_ROUTE};
use super::spec::AgentSpec;
use super::workflow::{WorkflowInstance, WorkflowState};

/// Snapshot served on `GET /status`
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub name: String,
    pub role: String,
    pub model: String,
    pub topic_name: String,
    pub broadcast_topic_name: String,
    pub memory_messages: usize,
    pub workflow_instances: usize,
    pub started_at: DateTime<Utc>,
}

struct AgentInner {
    spec: AgentSpec,
    llm: Arc<dyn ChatClient>,
    sidecar: Arc<dyn Sidecar>,
    registry: AgentRegistry,
    memory: ConversationMemory,
    workflows: RwLock<WorkflowState>,
    max_workflows: usize,
    bind_addr: (String, u16),
    sidecar_wait: Duration,
    started_at: DateTime<Utc>,
}

/// Cheap to clone; clones share one agent.
#[derive(Clone)]
pub struct AssistantAgent {
    inner: Arc<AgentInner>,
}

impl AssistantAgent {
    pub fn new(
        spec: AgentSpec,
        llm: Arc<dyn ChatClient>,
        sidecar: Arc<dyn Sidecar>,
        config: &AgentConfig,
    ) -> Self {
        let registry = AgentRegistry::new(sidecar.clone(), &spec, config.dapr.registry_retries);
        Self {
            inner: Arc::new(AgentInner {
                registry,
                llm,
                sidecar,
                memory: ConversationMemory::new(config.agent.memory_max_messages),
                workflows: RwLock::new(WorkflowState::default()),
                max_workflows: config.agent.max_workflow_instances,
                bind_addr: (config.agent.app_host.clone(), config.agent.app_port),
                sidecar_wait: Duration::from_secs(config.dapr.sidecar_wait_secs),
                started_at: Utc::now(),
                spec,
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.spec.name()
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.inner.spec
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.inner.memory
    }

    pub fn metadata(&self) -> AgentMetadata {
        AgentMetadata::from_spec(&self.inner.spec)
    }

    pub fn workflow_state(&self) -> WorkflowState {
        self.inner.workflows.read().clone()
    }

    pub fn system_prompt(&self) -> String {
        let date = Local::now().format("%B %d, %Y").to_string();
        self.inner.spec.persona.system_prompt(&date)
    }

    /// Own topic and the broadcast topic, both delivered to the events route
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let bindings = &self.inner.spec.bindings;
        [self.inner.spec.topic_name(), bindings.broadcast_topic_name.as_str()]
            .iter()
            .map(|topic| Subscription {
                pubsubname: bindings.message_bus_name.clone(),
                topic: topic.to_string(),
                route: EVENTS_ROUTE.to_string(),
            })
            .collect()
    }

    pub fn status(&self) -> AgentStatus {
        let spec = &self.inner.spec;
        AgentStatus {
            name: spec.persona.name.clone(),
            role: spec.persona.role.clone(),
            model: self.inner.llm.model().to_string(),
            topic_name: spec.topic_name().to_string(),
            broadcast_topic_name: spec.bindings.broadcast_topic_name.clone(),
            memory_messages: self.inner.memory.len(),
            workflow_instances: self.inner.workflows.read().len(),
            started_at: self.inner.started_at,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Message handling
    // ─────────────────────────────────────────────────────────────

    /// Run the persona on a task and answer both the sender and the broadcast topic.
    pub async fn handle_trigger(&self, source: &str, trigger: TriggerAction) -> Result<ActionResponse> {
        let spec = &self.inner.spec;
        let task = trigger.task.filter(|t| !t.trim().is_empty());
        let instance_id = uuid::Uuid::new_v4().to_string();

        info!(
            agent = %spec.name(),
            source,
            instance = %instance_id,
            has_task = task.is_some(),
            "Handling trigger"
        );

        let task_message = task.as_ref().map(|t| ChatMessage::user(t.clone()));

        let mut conversation = vec![ChatMessage::system(self.system_prompt())];
        conversation.extend(self.inner.memory.messages());
        conversation.extend(task_message.iter().cloned());

        let completion = self.inner.llm.complete(&conversation).await?;
        let reply = ChatMessage::assistant(completion.content.clone()).with_name(spec.name());

        debug!(
            tokens = completion.usage.total(),
            finish = ?completion.finish_reason,
            "Model replied"
        );

        let mut instance = WorkflowInstance::start(
            task,
            Some(source.to_string()).filter(|s| !s.is_empty()),
            trigger.workflow_instance_id.clone(),
        );
        instance.messages = conversation.into_iter().skip(1).collect();
        instance.messages.push(reply.clone());
        instance.finish(completion.content.clone());

        let mut snapshot = self.inner.workflows.read().clone();
        snapshot.insert(instance_id.clone(), instance.clone());
        snapshot.evict_oldest(self.inner.max_workflows);
        snapshot
            .save(
                self.inner.sidecar.as_ref(),
                &spec.bindings.state_store_name,
                &spec.bindings.state_key,
            )
            .await?;

        let broadcast = BroadcastMessage {
            name: spec.persona.name.clone(),
            role: spec.persona.role.clone(),
            content: completion.content.clone(),
        };
        self.publish(&spec.bindings.broadcast_topic_name, BROADCAST_MESSAGE, &broadcast)
            .await?;

        let response = ActionResponse {
            name: spec.persona.name.clone(),
            role: spec.persona.role.clone(),
            content: completion.content,
            workflow_instance_id: trigger.workflow_instance_id,
        };
        if !source.is_empty() && source != spec.name() {
            self.publish(source, ACTION_RESPONSE, &response).await?;
        }

        // Commit locally only once the store write and every publish succeeded
        if let Some(message) = task_message {
            self.inner.memory.push(message);
        }
        self.inner.memory.push(reply);
        {
            let mut workflows = self.inner.workflows.write();
            workflows.insert(instance_id, instance);
            workflows.evict_oldest(self.inner.max_workflows);
        }

        Ok(response)
    }

    /// Remember what another agent said. Returns false for the agent's own messages.
    pub fn handle_broadcast(&self, message: BroadcastMessage) -> bool {
        if message.name == self.name() {
            debug!("Ignoring own broadcast");
            return false;
        }
        self.inner
            .memory
            .push(ChatMessage::user(message.content).with_name(message.name));
        true
    }

    /// Dispatch a delivered CloudEvent by type
    pub async fn handle_event(&self, event: CloudEvent) -> DeliveryStatus {
        let outcome = match event.event_type.as_str() {
            TRIGGER_ACTION => match event.data_as::<TriggerAction>() {
                Ok(trigger) => self.handle_trigger(&event.source, trigger).await.map(|_| ()),
                Err(e) => Err(e),
            },
            BROADCAST_MESSAGE => event.data_as::<BroadcastMessage>().map(|msg| {
                self.handle_broadcast(msg);
            }),
            ACTION_RESPONSE => event.data_as::<ActionResponse>().map(|resp| {
                self.inner
                    .memory
                    .push(ChatMessage::user(resp.content).with_name(resp.name));
            }),
            other => {
                warn!(event_type = other, source = %event.source, "Dropping unknown event type");
                return DeliveryStatus::Drop;
            }
        };

        match outcome {
            Ok(()) => DeliveryStatus::Success,
            Err(e) if e.is_retryable() => {
                warn!(error = %e, event_type = %event.event_type, "Event failed, asking for redelivery");
                DeliveryStatus::Retry
            }
            Err(e) => {
                error!("{}", e.format_for_log());
                DeliveryStatus::Drop
            }
        }
    }

    async fn publish<T: Serialize>(&self, topic: &str, event_type: &str, payload: &T) -> Result<()> {
        let event = CloudEvent::with_payload(self.name(), event_type, payload)?;
        self.inner
            .sidecar
            .publish(&self.inner.spec.bindings.message_bus_name, topic, &event)
            .await
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Start and serve until Ctrl+C
    pub async fn start<R>(&self, on_ready: R) -> Result<()>
    where
        R: FnOnce(SocketAddr) + Send,
    {
        self.start_with_shutdown(on_ready, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
    }

    /// Start and serve until `shutdown` completes
    pub async fn start_with_shutdown<R, S>(&self, on_ready: R, shutdown: S) -> Result<()>
    where
        R: FnOnce(SocketAddr) + Send,
        S: Future<Output = ()> + Send + 'static,
    {
        let inner = &self.inner;
        let bindings = &inner.spec.bindings;

        wait_until_ready(inner.sidecar.as_ref(), inner.sidecar_wait).await?;

        let loaded = WorkflowState::load(
            inner.sidecar.as_ref(),
            &bindings.state_store_name,
            &bindings.state_key,
        )
        .await?;
        let mut loaded = loaded;
        let evicted = loaded.evict_oldest(inner.max_workflows);
        if evicted > 0 {
            debug!(evicted, "Trimmed loaded workflow state");
        }
        *inner.workflows.write() = loaded;

        let metadata = self.metadata();
        inner.registry.register(&metadata).await?;

        let (ref host, port) = inner.bind_addr;
        let listener = match TcpListener::bind((host.as_str(), port)).await {
            Ok(listener) => listener,
            Err(source) => {
                self.deregister_quietly().await;
                return Err(Error::AgentBind {
                    addr: format!("{}:{}", host, port),
                    source,
                });
            }
        };
        let local_addr = listener.local_addr()?;

        info!(
            agent = %metadata.name,
            addr = %local_addr,
            topic = %metadata.topic_name,
            "Agent serving"
        );
        on_ready(local_addr);

        let served = axum::serve(listener, server::router(self.clone()))
            .with_graceful_shutdown(shutdown)
            .await;

        self.deregister_quietly().await;
        served?;
        info!(agent = %metadata.name, "Agent stopped");
        Ok(())
    }

    async fn deregister_quietly(&self) {
        if let Err(e) = self.inner.registry.deregister(self.name()).await {
            warn!(error = %e, "Failed to deregister agent");
        }
    }
}
