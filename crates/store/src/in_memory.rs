//! In-memory state store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use stepwise_core::error::StoreError;
use stepwise_core::message::ConversationId;
use stepwise_core::state::{AgentState, AgentStatus};
use stepwise_core::store::{StatePatch, StateStore};
use tokio::sync::RwLock;

/// Keeps every conversation's state in a map behind one `RwLock`.
/// A patch is applied while holding the write lock, so readers never
/// observe a half-applied update.
#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    states: Arc<RwLock<HashMap<ConversationId, AgentState>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations with stored state.
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, id: &ConversationId) -> Result<Option<AgentState>, StoreError> {
        Ok(self.states.read().await.get(id).cloned())
    }

    async fn create(
        &self,
        id: &ConversationId,
        status: AgentStatus,
    ) -> Result<AgentState, StoreError> {
        let state = AgentState::new(id.clone(), status);
        self.states.write().await.insert(id.clone(), state.clone());
        Ok(state)
    }

    async fn update(
        &self,
        id: &ConversationId,
        patch: StatePatch,
    ) -> Result<Option<AgentState>, StoreError> {
        let mut states = self.states.write().await;
        let Some(state) = states.get_mut(id) else {
            return Ok(None);
        };
        patch.check_version(state)?;
        patch.apply_to(state);
        Ok(Some(state.clone()))
    }

    async fn delete(&self, id: &ConversationId) -> Result<(), StoreError> {
        self.states.write().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::state::{AgentPlan, PlanStep};

    fn conv() -> ConversationId {
        ConversationId::from("conv-1")
    }

    #[tokio::test]
    async fn create_then_load() {
        let store = InMemoryStateStore::new();
        store.create(&conv(), AgentStatus::Idle).await.unwrap();
        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.status, AgentStatus::Idle);
        assert_eq!(state.version, 0);
    }

    #[tokio::test]
    async fn load_missing_is_none() {
        let store = InMemoryStateStore::new();
        assert!(store.load(&conv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_is_none() {
        let store = InMemoryStateStore::new();
        let result = store
            .update(&conv(), StatePatch::new().status(AgentStatus::Executing))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn update_applies_all_fields_and_bumps_version() {
        let store = InMemoryStateStore::new();
        store.create(&conv(), AgentStatus::Idle).await.unwrap();
        let plan = AgentPlan::new("g", vec![PlanStep::pending("s", None)], "r").unwrap();

        let state = store
            .update(
                &conv(),
                StatePatch::new()
                    .status(AgentStatus::Executing)
                    .plan(Some(plan.clone()))
                    .current_step_index(0),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.status, AgentStatus::Executing);
        assert_eq!(state.plan, Some(plan));
        assert_eq!(state.version, 1);
    }

    #[tokio::test]
    async fn stale_version_applies_nothing() {
        let store = InMemoryStateStore::new();
        store.create(&conv(), AgentStatus::Idle).await.unwrap();
        store
            .update(&conv(), StatePatch::new().status(AgentStatus::Planning))
            .await
            .unwrap();

        let err = store
            .update(
                &conv(),
                StatePatch::new()
                    .status(AgentStatus::Completed)
                    .expect_version(0),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.status, AgentStatus::Planning);
        assert_eq!(state.version, 1);
    }

    #[tokio::test]
    async fn create_replaces_existing_state() {
        let store = InMemoryStateStore::new();
        store.create(&conv(), AgentStatus::Idle).await.unwrap();
        store
            .update(&conv(), StatePatch::new().status(AgentStatus::Completed))
            .await
            .unwrap();
        let fresh = store.create(&conv(), AgentStatus::Idle).await.unwrap();
        assert_eq!(fresh.status, AgentStatus::Idle);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryStateStore::new();
        store.create(&conv(), AgentStatus::Idle).await.unwrap();
        store.delete(&conv()).await.unwrap();
        store.delete(&conv()).await.unwrap();
        assert!(store.load(&conv()).await.unwrap().is_none());
    }
}
