//! State store — durable per-conversation agent state.
//!
//! The orchestration core only needs four primitives keyed by
//! [`ConversationId`]: load, create, update and delete. Updates are expressed
//! as a [`StatePatch`]; every field present in a patch must be applied
//! together or not at all.
//!
//! A patch may carry an `expected_version`. Stores compare it against the
//! stored `version` and refuse the write with
//! [`StoreError::VersionConflict`] on mismatch, so two loops racing on the
//! same conversation cannot silently overwrite each other.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::message::ConversationId;
use crate::state::{AgentPlan, AgentState, AgentStatus, CompletedStep};

/// A partial update of an [`AgentState`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub status: Option<AgentStatus>,
    /// `Some(None)` clears the plan
    pub plan: Option<Option<AgentPlan>>,
    pub current_step_index: Option<usize>,
    pub completed_steps: Option<Vec<CompletedStep>>,
    pub context: Option<BTreeMap<String, serde_json::Value>>,
    /// Apply only if the stored version still equals this value
    pub expected_version: Option<u64>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// The patch that returns a state to `idle` with plan, cursor, logs and
    /// findings wiped.
    pub fn reset() -> Self {
        Self {
            status: Some(AgentStatus::Idle),
            plan: Some(None),
            current_step_index: Some(0),
            completed_steps: Some(Vec::new()),
            context: Some(BTreeMap::new()),
            expected_version: None,
        }
    }

    pub fn status(mut self, status: AgentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn plan(mut self, plan: Option<AgentPlan>) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn current_step_index(mut self, index: usize) -> Self {
        self.current_step_index = Some(index);
        self
    }

    pub fn completed_steps(mut self, steps: Vec<CompletedStep>) -> Self {
        self.completed_steps = Some(steps);
        self
    }

    pub fn context(mut self, context: BTreeMap<String, serde_json::Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn expect_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Reject the patch if `state` has moved past the expected version.
    pub fn check_version(&self, state: &AgentState) -> Result<(), StoreError> {
        match self.expected_version {
            Some(expected) if expected != state.version => Err(StoreError::VersionConflict {
                conversation_id: state.conversation_id.to_string(),
                expected,
                actual: state.version,
            }),
            _ => Ok(()),
        }
    }

    /// Apply every present field to `state`, bump its version and touch
    /// `updated_at`. Callers check the version first.
    pub fn apply_to(self, state: &mut AgentState) {
        if let Some(status) = self.status {
            state.status = status;
        }
        if let Some(plan) = self.plan {
            state.plan = plan;
        }
        if let Some(index) = self.current_step_index {
            state.current_step_index = index;
        }
        if let Some(steps) = self.completed_steps {
            state.completed_steps = steps;
        }
        if let Some(context) = self.context {
            state.context = context;
        }
        state.version += 1;
        state.updated_at = Utc::now();
    }
}

/// Durable key-value storage of agent state, one entry per conversation.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Load the state of a conversation, if one exists.
    async fn load(&self, id: &ConversationId) -> Result<Option<AgentState>, StoreError>;

    /// Create a fresh state, replacing any existing one.
    async fn create(
        &self,
        id: &ConversationId,
        status: AgentStatus,
    ) -> Result<AgentState, StoreError>;

    /// Atomically apply `patch`. Returns `Ok(None)` when no state exists.
    async fn update(
        &self,
        id: &ConversationId,
        patch: StatePatch,
    ) -> Result<Option<AgentState>, StoreError>;

    /// Delete a conversation's state. Deleting a missing state is not an error.
    async fn delete(&self, id: &ConversationId) -> Result<(), StoreError>;
}
