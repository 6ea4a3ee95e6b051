//! Step completion tracker.
//!
//! Two read-modify-write operations against the [`StateStore`]. Both load
//! the current state, build one patch and write it with the loaded version
//! as `expected_version`, so a concurrent writer turns into a
//! [`StoreError::VersionConflict`] instead of a lost update.
//!
//! Neither operation remembers what it has already seen. Calling
//! `complete_current_step` twice advances twice; the orchestrator's round
//! cursor is what keeps rounds from being folded more than once.

use chrono::Utc;
use std::sync::Arc;
use stepwise_core::error::StoreError;
use stepwise_core::message::ConversationId;
use stepwise_core::state::{AgentState, AgentStatus, CompletedStep};
use stepwise_core::store::{StatePatch, StateStore};
use tracing::{debug, warn};

pub struct StepTracker {
    store: Arc<dyn StateStore>,
}

impl StepTracker {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Merge `{key: value}` into the accumulated context (last write wins).
    /// Returns `Ok(None)` when the conversation has no state.
    pub async fn add_to_context(
        &self,
        id: &ConversationId,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<Option<AgentState>, StoreError> {
        let Some(state) = self.store.load(id).await? else {
            return Ok(None);
        };

        let key = key.into();
        let mut context = state.context;
        context.insert(key.clone(), value);

        debug!(conversation_id = %id, key = %key, "Adding to context");
        self.store
            .update(
                id,
                StatePatch::new()
                    .context(context)
                    .expect_version(state.version),
            )
            .await
    }

    /// Mark the step under the cursor done with `result`, log it and
    /// advance the cursor.
    ///
    /// Returns `Ok(None)` (and writes nothing) when there is no state, no
    /// plan, or the cursor is already past the last step. The plan, log,
    /// cursor and status are written in a single patch.
    pub async fn complete_current_step(
        &self,
        id: &ConversationId,
        result: impl Into<String>,
    ) -> Result<Option<AgentState>, StoreError> {
        let Some(state) = self.store.load(id).await? else {
            return Ok(None);
        };
        let Some(mut plan) = state.plan.clone() else {
            return Ok(None);
        };
        let index = state.current_step_index;
        let last_index = plan.steps.len().saturating_sub(1);
        let Some(step) = plan.steps.get_mut(index) else {
            debug!(conversation_id = %id, index, "Cursor past the end of the plan");
            return Ok(None);
        };

        let result = result.into();
        if !step.mark_done(result.clone()) {
            warn!(
                conversation_id = %id,
                step_id = %step.id,
                "Step under the cursor was already done"
            );
        }

        let mut completed = state.completed_steps.clone();
        completed.push(CompletedStep {
            step_id: step.id.clone(),
            description: step.description.clone(),
            result,
            timestamp: Utc::now(),
        });

        let status = if index == last_index {
            AgentStatus::Completed
        } else {
            AgentStatus::Executing
        };

        let updated = self
            .store
            .update(
                id,
                StatePatch::new()
                    .plan(Some(plan))
                    .completed_steps(completed)
                    .current_step_index(index + 1)
                    .status(status)
                    .expect_version(state.version),
            )
            .await?;

        if let Some(updated) = &updated {
            debug!(
                conversation_id = %id,
                step_index = index,
                status = %updated.status,
                "Completed plan step"
            );
            for issue in updated.consistency_issues() {
                warn!(conversation_id = %id, issue = %issue, "Plan state drift");
            }
        }
        Ok(updated)
    }
}
