//! Domain event system — observability output of the agent loop.
//!
//! Events are fire-and-forget: the loop publishes them and never depends on
//! anyone receiving them. The UI/transport layer subscribes and forwards
//! whatever it cares about (status changes, plan snapshots, round progress).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::state::{AgentPlan, AgentStatus};

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// The durable plan status of a conversation changed (or was re-announced)
    StatusChanged {
        conversation_id: String,
        status: AgentStatus,
        timestamp: DateTime<Utc>,
    },

    /// Snapshot of the current plan and cursor
    PlanUpdated {
        conversation_id: String,
        plan: AgentPlan,
        current_step_index: usize,
        timestamp: DateTime<Utc>,
    },

    /// A reasoning round finished
    RoundCompleted {
        conversation_id: String,
        round: usize,
        max_rounds: usize,
        actions: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The reasoning engine produced a response
    ResponseGenerated {
        conversation_id: String,
        model: String,
        tokens_used: u32,
        timestamp: DateTime<Utc>,
    },

    /// A replan policy judged the latest round a failure. Advisory only.
    ReplanSuggested {
        conversation_id: String,
        round: usize,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn status_changed(conversation_id: impl ToString, status: AgentStatus) -> Self {
        Self::StatusChanged {
            conversation_id: conversation_id.to_string(),
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn plan_updated(
        conversation_id: impl ToString,
        plan: AgentPlan,
        current_step_index: usize,
    ) -> Self {
        Self::PlanUpdated {
            conversation_id: conversation_id.to_string(),
            plan,
            current_step_index,
            timestamp: Utc::now(),
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
