//! Task planner — prepares a conversation's state before a loop runs.
//!
//! The planner is the only writer between loops. For each new task it
//! ensures a state exists, wipes whatever the previous task left behind,
//! and attaches a fresh plan when the trigger heuristic says the task is
//! worth one.

pub mod generator;
pub mod trigger;

pub use generator::{FALLBACK_FIRST_STEP, FALLBACK_SECOND_STEP, PlanContext, PlanGenerator, fallback_plan};
pub use trigger::{MIN_PLAN_TASK_CHARS, should_create_plan};

use std::sync::Arc;
use stepwise_core::error::StoreError;
use stepwise_core::event::{DomainEvent, EventBus};
use stepwise_core::message::ConversationId;
use stepwise_core::state::{AgentState, AgentStatus};
use stepwise_core::store::{StatePatch, StateStore};
use tracing::{debug, info};

pub struct TaskPlanner {
    store: Arc<dyn StateStore>,
    generator: Option<PlanGenerator>,
    event_bus: Arc<EventBus>,
}

impl TaskPlanner {
    /// A planner that never attaches plans.
    pub fn new(store: Arc<dyn StateStore>, event_bus: Arc<EventBus>) -> Self {
        Self {
            store,
            generator: None,
            event_bus,
        }
    }

    /// Enable planning with `generator`.
    pub fn with_generator(mut self, generator: PlanGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Get the conversation ready for `task` and return its state.
    ///
    /// Store failures here are hard errors: without a state the loop has
    /// nothing to track.
    pub async fn prepare(
        &self,
        id: &ConversationId,
        task: &str,
        context: Option<&PlanContext>,
    ) -> Result<AgentState, StoreError> {
        let mut state = match self.store.load(id).await? {
            Some(existing) if is_pristine(&existing) => existing,
            Some(_) => {
                debug!(conversation_id = %id, "Resetting state left by a previous task");
                let reset = self.reset(id).await?;
                require(reset, id)?
            }
            None => {
                debug!(conversation_id = %id, "Creating agent state");
                self.store.create(id, AgentStatus::Idle).await?
            }
        };

        let Some(generator) = &self.generator else {
            return Ok(state);
        };
        if !should_create_plan(task) {
            debug!(conversation_id = %id, "Task too simple for a plan");
            return Ok(state);
        }

        state = require(
            self.store
                .update(
                    id,
                    StatePatch::new()
                        .status(AgentStatus::Planning)
                        .expect_version(state.version),
                )
                .await?,
            id,
        )?;
        self.event_bus
            .publish(DomainEvent::status_changed(id, AgentStatus::Planning));

        let plan = generator.create_plan(task, context).await;
        info!(conversation_id = %id, steps = plan.len(), "Attaching plan");

        state = require(
            self.store
                .update(
                    id,
                    StatePatch::new()
                        .plan(Some(plan.clone()))
                        .current_step_index(0)
                        .status(AgentStatus::Executing)
                        .expect_version(state.version),
                )
                .await?,
            id,
        )?;
        self.event_bus
            .publish(DomainEvent::status_changed(id, AgentStatus::Executing));
        self.event_bus.publish(DomainEvent::plan_updated(id, plan, 0));

        Ok(state)
    }

    /// Return the state to `idle` with plan, cursor, logs and findings
    /// wiped. `Ok(None)` when the conversation has no state.
    pub async fn reset(&self, id: &ConversationId) -> Result<Option<AgentState>, StoreError> {
        let state = self.store.update(id, StatePatch::reset()).await?;
        if state.is_some() {
            self.event_bus
                .publish(DomainEvent::status_changed(id, AgentStatus::Idle));
        }
        Ok(state)
    }

    /// Delete the conversation's state.
    pub async fn forget(&self, id: &ConversationId) -> Result<(), StoreError> {
        self.store.delete(id).await
    }
}

fn is_pristine(state: &AgentState) -> bool {
    state.status == AgentStatus::Idle
        && state.plan.is_none()
        && state.current_step_index == 0
        && state.completed_steps.is_empty()
        && state.context.is_empty()
}

fn require(state: Option<AgentState>, id: &ConversationId) -> Result<AgentState, StoreError> {
    state.ok_or_else(|| StoreError::Storage(format!("state for {id} disappeared during planning")))
}
