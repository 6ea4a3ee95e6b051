//! Loop orchestrator.
//!
//! Runs before every reasoning call of a plan-aware loop:
//!
//! 1. Fold every round not yet seen into durable state: each distinct
//!    action result goes into the accumulated context under
//!    `round_{index}_{action}`, and a round with at least one result
//!    completes exactly one plan step.
//! 2. Reload the state and render it with the [`StateContextFormatter`].
//! 3. Hand the rendering back as an [`Injection`] and publish status and
//!    plan snapshots on the [`EventBus`].
//!
//! Which rounds have been folded is tracked by an [`OrchestrationCursor`]
//! owned by the caller and passed in by `&mut`. The cursor only moves past
//! a round once all of that round's writes succeeded, so a round whose
//! bookkeeping failed is retried on the next call. Bookkeeping failures
//! never reach the caller: they are logged and the step runs without an
//! injection.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use stepwise_core::error::StoreError;
use stepwise_core::event::{DomainEvent, EventBus};
use stepwise_core::message::{ConversationId, Message};
use stepwise_core::state::{AgentState, AgentStatus};
use stepwise_core::store::StateStore;
use stepwise_core::tool::ToolResult;
use tracing::{debug, info, warn};

use crate::context::StateContextFormatter;
use crate::replan::{NeverReplan, ReplanPolicy};
use crate::tracker::StepTracker;

/// Default length of a result summary folded into context, in characters.
pub const RESULT_PREVIEW_CHARS: usize = 500;

/// One executed action and its result.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub call_id: String,
    pub name: String,
    pub result: ToolResult,
}

/// Everything the actions of one reasoning round produced.
#[derive(Debug, Clone, Default)]
pub struct Round {
    pub index: usize,
    pub actions: Vec<ActionOutcome>,
}

impl Round {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            actions: Vec::new(),
        }
    }

    pub fn push(&mut self, call_id: impl Into<String>, name: impl Into<String>, result: ToolResult) {
        self.actions.push(ActionOutcome {
            call_id: call_id.into(),
            name: name.into(),
            result,
        });
    }

    /// Results with a repeated call id are dropped; first one wins.
    pub fn distinct_actions(&self) -> Vec<&ActionOutcome> {
        let mut seen = HashSet::new();
        self.actions
            .iter()
            .filter(|a| seen.insert(a.call_id.as_str()))
            .collect()
    }

    /// Action names in call order, each listed once.
    pub fn action_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.actions
            .iter()
            .map(|a| a.name.as_str())
            .filter(|n| seen.insert(*n))
            .collect()
    }

    pub fn called(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.name == name)
    }
}

/// How many rounds of the current run have been folded into state.
///
/// Created fresh for every run and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestrationCursor {
    conversation_id: Option<ConversationId>,
    rounds_processed: usize,
}

impl OrchestrationCursor {
    pub fn new(conversation_id: Option<ConversationId>) -> Self {
        Self {
            conversation_id,
            rounds_processed: 0,
        }
    }

    /// Continue a run that already folded `rounds_processed` rounds.
    pub fn resume(conversation_id: ConversationId, rounds_processed: usize) -> Self {
        Self {
            conversation_id: Some(conversation_id),
            rounds_processed,
        }
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation_id.as_ref()
    }

    pub fn rounds_processed(&self) -> usize {
        self.rounds_processed
    }
}

/// The outcome of [`LoopOrchestrator::prepare_step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// Nothing to add; the step runs on the plain history
    Skipped,
    /// Rendered state to append for this step only
    Injected(String),
}

impl Injection {
    pub fn is_injected(&self) -> bool {
        matches!(self, Self::Injected(_))
    }

    /// The injection as an instruction message.
    pub fn to_message(&self) -> Option<Message> {
        match self {
            Self::Skipped => None,
            Self::Injected(text) => Some(Message::system(text.clone())),
        }
    }
}

pub struct LoopOrchestrator {
    store: Arc<dyn StateStore>,
    tracker: StepTracker,
    formatter: StateContextFormatter,
    event_bus: Arc<EventBus>,
    replan: Box<dyn ReplanPolicy>,
    preview_chars: usize,
}

impl LoopOrchestrator {
    pub fn new(store: Arc<dyn StateStore>, event_bus: Arc<EventBus>) -> Self {
        Self {
            tracker: StepTracker::new(store.clone()),
            store,
            formatter: StateContextFormatter::default(),
            event_bus,
            replan: Box::new(NeverReplan),
            preview_chars: RESULT_PREVIEW_CHARS,
        }
    }

    pub fn with_formatter(mut self, formatter: StateContextFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars.max(1);
        self
    }

    pub fn with_replan_policy(mut self, policy: Box<dyn ReplanPolicy>) -> Self {
        self.replan = policy;
        self
    }

    /// Fold unseen rounds, then render the state for the next reasoning
    /// call. Never fails.
    pub async fn prepare_step(
        &self,
        cursor: &mut OrchestrationCursor,
        rounds: &[Round],
    ) -> Injection {
        let Some(id) = cursor.conversation_id.clone() else {
            return Injection::Skipped;
        };

        let result = match self.fold_rounds(&id, cursor, rounds).await {
            Ok(()) => self.render(&id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(injection) => injection,
            Err(e) => {
                warn!(conversation_id = %id, error = %e, "State bookkeeping failed, skipping injection");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: format!("orchestrator:{id}"),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Injection::Skipped
            }
        }
    }

    /// Fold any rounds the last `prepare_step` did not see. Called once
    /// after the loop stops; renders nothing.
    pub async fn finish(&self, cursor: &mut OrchestrationCursor, rounds: &[Round]) {
        let Some(id) = cursor.conversation_id.clone() else {
            return;
        };
        if let Err(e) = self.fold_rounds(&id, cursor, rounds).await {
            warn!(conversation_id = %id, error = %e, "Failed to fold final rounds");
        }
    }

    async fn fold_rounds(
        &self,
        id: &ConversationId,
        cursor: &mut OrchestrationCursor,
        rounds: &[Round],
    ) -> Result<(), StoreError> {
        while let Some(round) = rounds.get(cursor.rounds_processed) {
            self.fold_round(id, round).await?;
            cursor.rounds_processed += 1;
        }
        Ok(())
    }

    async fn fold_round(&self, id: &ConversationId, round: &Round) -> Result<(), StoreError> {
        let actions = round.distinct_actions();
        if actions.is_empty() {
            debug!(conversation_id = %id, round = round.index, "Round produced no results");
            return Ok(());
        }

        let mut per_name: HashMap<&str, usize> = HashMap::new();
        for action in &actions {
            let seen = per_name.entry(action.name.as_str()).or_insert(0);
            *seen += 1;
            let key = context_key(round.index, &action.name, *seen);
            let summary = summarize(&action.result.payload(), self.preview_chars);
            self.tracker
                .add_to_context(id, key, serde_json::Value::String(summary))
                .await?;
        }

        let names = round.action_names();
        let summary = format!("Executed: {}", names.join(", "));
        let state = self.tracker.complete_current_step(id, summary).await?;

        if let Some(state) = state {
            info!(
                conversation_id = %id,
                round = round.index,
                step_index = state.current_step_index,
                status = %state.status,
                "Folded round into plan state"
            );
            if self.replan.should_replan(&state, round) {
                let reason = format!("round {} reported failing actions", round.index);
                info!(conversation_id = %id, round = round.index, "Replan suggested");
                self.event_bus.publish(DomainEvent::ReplanSuggested {
                    conversation_id: id.to_string(),
                    round: round.index,
                    reason,
                    timestamp: Utc::now(),
                });
            }
        }
        Ok(())
    }

    async fn render(&self, id: &ConversationId) -> Result<Injection, StoreError> {
        let Some(state) = self.store.load(id).await? else {
            return Ok(Injection::Skipped);
        };
        if state.status == AgentStatus::Idle {
            return Ok(Injection::Skipped);
        }

        let text = self.formatter.format(Some(&state));
        if text.is_empty() {
            return Ok(Injection::Skipped);
        }

        self.announce(&state);
        debug!(conversation_id = %id, chars = text.chars().count(), "Injecting plan state");
        Ok(Injection::Injected(text))
    }

    fn announce(&self, state: &AgentState) {
        self.event_bus
            .publish(DomainEvent::status_changed(&state.conversation_id, state.status));
        if let Some(plan) = &state.plan {
            self.event_bus.publish(DomainEvent::plan_updated(
                &state.conversation_id,
                plan.clone(),
                state.current_step_index,
            ));
        }
    }
}

/// `round_{index}_{name}`, with `_{n}` for the n-th repeat of a name.
fn context_key(round: usize, name: &str, occurrence: usize) -> String {
    if occurrence <= 1 {
        format!("round_{round}_{name}")
    } else {
        format!("round_{round}_{name}_{occurrence}")
    }
}

/// Strings are truncated as-is; other values are serialized first.
pub fn summarize(value: &serde_json::Value, max_chars: usize) -> String {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replan::FailureKeywordReplan;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use stepwise_core::state::{AgentPlan, PlanStep};
    use stepwise_core::store::StatePatch;
    use stepwise_store::InMemoryStateStore;

    fn conv() -> ConversationId {
        ConversationId::from("conv-orch")
    }

    async fn planned_store(steps: usize) -> Arc<InMemoryStateStore> {
        let store = Arc::new(InMemoryStateStore::new());
        store.create(&conv(), AgentStatus::Idle).await.unwrap();
        let plan = AgentPlan::new(
            "Summarize AI trends",
            (0..steps)
                .map(|i| PlanStep::pending(format!("step {i}"), None))
                .collect(),
            "r",
        )
        .unwrap();
        store
            .update(
                &conv(),
                StatePatch::new()
                    .status(AgentStatus::Executing)
                    .plan(Some(plan)),
            )
            .await
            .unwrap();
        store
    }

    fn round(index: usize, actions: &[(&str, &str, &str)]) -> Round {
        let mut r = Round::new(index);
        for (id, name, output) in actions {
            r.push(*id, *name, ToolResult::text(*output));
        }
        r
    }

    #[tokio::test]
    async fn no_conversation_means_no_injection() {
        let store = planned_store(2).await;
        let orch = LoopOrchestrator::new(store.clone(), Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::new(None);
        let rounds = vec![round(0, &[("c1", "web_search", "x")])];

        assert_eq!(orch.prepare_step(&mut cursor, &rounds).await, Injection::Skipped);
        assert_eq!(cursor.rounds_processed(), 0);
        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.current_step_index, 0);
    }

    #[tokio::test]
    async fn first_step_injects_plan_without_folding() {
        let store = planned_store(2).await;
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let orch = LoopOrchestrator::new(store, bus);
        let mut cursor = OrchestrationCursor::new(Some(conv()));

        let injection = orch.prepare_step(&mut cursor, &[]).await;
        let Injection::Injected(text) = &injection else {
            panic!("expected injection, got {injection:?}");
        };
        assert!(text.contains("1. [IN_PROGRESS] step 0"));
        assert_eq!(injection.to_message().unwrap().content, *text);

        let first = rx.recv().await.unwrap();
        assert!(matches!(first.as_ref(), DomainEvent::StatusChanged { status: AgentStatus::Executing, .. }));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second.as_ref(), DomainEvent::PlanUpdated { current_step_index: 0, .. }));
    }

    #[tokio::test]
    async fn one_step_per_round_regardless_of_result_count() {
        let store = planned_store(3).await;
        let orch = LoopOrchestrator::new(store.clone(), Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::new(Some(conv()));

        let rounds = vec![round(
            0,
            &[
                ("c1", "web_search", "five articles"),
                ("c2", "fetch_url", "page text"),
                ("c3", "analyze_content", "key points"),
            ],
        )];
        let injection = orch.prepare_step(&mut cursor, &rounds).await;
        assert!(injection.is_injected());
        assert_eq!(cursor.rounds_processed(), 1);

        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.completed_steps.len(), 1);
        assert_eq!(
            state.completed_steps[0].result,
            "Executed: web_search, fetch_url, analyze_content"
        );
        assert_eq!(state.context["round_0_web_search"], "five articles");
        assert_eq!(state.context["round_0_fetch_url"], "page text");
        assert_eq!(state.context["round_0_analyze_content"], "key points");
    }

    #[tokio::test]
    async fn rounds_are_never_folded_twice() {
        let store = planned_store(3).await;
        let orch = LoopOrchestrator::new(store.clone(), Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::new(Some(conv()));

        let mut rounds = vec![round(0, &[("c1", "web_search", "a")])];
        orch.prepare_step(&mut cursor, &rounds).await;
        orch.prepare_step(&mut cursor, &rounds).await;
        rounds.push(round(1, &[("c2", "fetch_url", "b")]));
        orch.prepare_step(&mut cursor, &rounds).await;

        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.current_step_index, 2);
        assert_eq!(state.completed_steps.len(), 2);
        assert_eq!(cursor.rounds_processed(), 2);
    }

    #[tokio::test]
    async fn several_unseen_rounds_are_folded_in_order() {
        let store = planned_store(3).await;
        let orch = LoopOrchestrator::new(store.clone(), Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::new(Some(conv()));

        let rounds = vec![
            round(0, &[("c1", "web_search", "a")]),
            round(1, &[("c2", "fetch_url", "b")]),
        ];
        orch.prepare_step(&mut cursor, &rounds).await;
        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.completed_steps[0].result, "Executed: web_search");
        assert_eq!(state.completed_steps[1].result, "Executed: fetch_url");
    }

    #[tokio::test]
    async fn empty_rounds_advance_the_cursor_but_not_the_plan() {
        let store = planned_store(2).await;
        let orch = LoopOrchestrator::new(store.clone(), Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::new(Some(conv()));

        orch.prepare_step(&mut cursor, &[Round::new(0)]).await;
        assert_eq!(cursor.rounds_processed(), 1);
        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.current_step_index, 0);
    }

    #[tokio::test]
    async fn repeated_names_and_call_ids() {
        let store = planned_store(2).await;
        let orch = LoopOrchestrator::new(store.clone(), Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::new(Some(conv()));

        let rounds = vec![round(
            2,
            &[
                ("c1", "web_search", "first query"),
                ("c1", "web_search", "duplicate id"),
                ("c2", "web_search", "second query"),
            ],
        )];
        orch.prepare_step(&mut cursor, &rounds).await;

        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.context.len(), 2);
        assert_eq!(state.context["round_2_web_search"], "first query");
        assert_eq!(state.context["round_2_web_search_2"], "second query");
        assert_eq!(state.completed_steps[0].result, "Executed: web_search");
    }

    #[tokio::test]
    async fn results_are_summarized_to_preview_length() {
        let store = planned_store(2).await;
        let orch = LoopOrchestrator::new(store.clone(), Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::new(Some(conv()));

        let mut r = Round::new(0);
        r.push("c1", "fetch_url", ToolResult::text("y".repeat(2_000)));
        r.push(
            "c2",
            "web_search",
            ToolResult::structured(serde_json::json!({"results": ["z".repeat(900)]})),
        );
        orch.prepare_step(&mut cursor, &[r]).await;

        let state = store.load(&conv()).await.unwrap().unwrap();
        let fetched = state.context["round_0_fetch_url"].as_str().unwrap();
        assert_eq!(fetched.chars().count(), RESULT_PREVIEW_CHARS);
        let searched = state.context["round_0_web_search"].as_str().unwrap();
        assert_eq!(searched.chars().count(), RESULT_PREVIEW_CHARS);
        assert!(searched.starts_with(r#"{"results":["zzz"#));
    }

    #[tokio::test]
    async fn failed_results_are_folded_too() {
        let store = planned_store(2).await;
        let orch = LoopOrchestrator::new(store.clone(), Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::new(Some(conv()));

        let mut r = Round::new(0);
        r.push("c1", "web_search", ToolResult::failure("missing_api_key", "no key"));
        orch.prepare_step(&mut cursor, &[r]).await;

        let state = store.load(&conv()).await.unwrap().unwrap();
        assert!(state.context["round_0_web_search"].as_str().unwrap().contains("missing_api_key"));
        assert_eq!(state.current_step_index, 1);
    }

    #[tokio::test]
    async fn completing_the_plan_keeps_injecting_completed_state() {
        let store = planned_store(1).await;
        let orch = LoopOrchestrator::new(store.clone(), Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::new(Some(conv()));

        let rounds = vec![
            round(0, &[("c1", "web_search", "a")]),
            round(1, &[("c2", "fetch_url", "b")]),
        ];
        let injection = orch.prepare_step(&mut cursor, &rounds).await;
        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.status, AgentStatus::Completed);
        assert_eq!(state.completed_steps.len(), 1);
        // The second round still lands in context.
        assert!(state.context.contains_key("round_1_fetch_url"));
        let Injection::Injected(text) = injection else {
            panic!("expected injection");
        };
        assert!(text.contains("1. [DONE] step 0"));
    }

    #[tokio::test]
    async fn idle_state_is_not_injected() {
        let store = Arc::new(InMemoryStateStore::new());
        store.create(&conv(), AgentStatus::Idle).await.unwrap();
        let orch = LoopOrchestrator::new(store, Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::new(Some(conv()));
        assert_eq!(orch.prepare_step(&mut cursor, &[]).await, Injection::Skipped);
    }

    #[tokio::test]
    async fn finish_folds_the_last_round_without_rendering() {
        let store = planned_store(2).await;
        let bus = Arc::new(EventBus::default());
        let orch = LoopOrchestrator::new(store.clone(), bus.clone());
        let mut cursor = OrchestrationCursor::new(Some(conv()));
        let rounds = vec![round(0, &[("c1", "final_answer", "done")])];

        let mut rx = bus.subscribe();
        orch.finish(&mut cursor, &rounds).await;
        assert_eq!(cursor.rounds_processed(), 1);
        assert!(rx.try_recv().is_err());
        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.current_step_index, 1);
    }

    #[tokio::test]
    async fn resumed_cursor_skips_folded_rounds() {
        let store = planned_store(3).await;
        let orch = LoopOrchestrator::new(store.clone(), Arc::new(EventBus::default()));
        let mut cursor = OrchestrationCursor::resume(conv(), 1);
        let rounds = vec![
            round(0, &[("c1", "web_search", "already folded")]),
            round(1, &[("c2", "fetch_url", "new")]),
        ];
        orch.prepare_step(&mut cursor, &rounds).await;
        let state = store.load(&conv()).await.unwrap().unwrap();
        assert!(!state.context.contains_key("round_0_web_search"));
        assert_eq!(state.completed_steps.len(), 1);
        assert_eq!(cursor.rounds_processed(), 2);
    }

    /// Fails every load while `broken` is set.
    struct FlakyStore {
        inner: InMemoryStateStore,
        broken: AtomicBool,
    }

    #[async_trait]
    impl StateStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn load(&self, id: &ConversationId) -> Result<Option<AgentState>, StoreError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(StoreError::Storage("unreachable".into()));
            }
            self.inner.load(id).await
        }
        async fn create(
            &self,
            id: &ConversationId,
            status: AgentStatus,
        ) -> Result<AgentState, StoreError> {
            self.inner.create(id, status).await
        }
        async fn update(
            &self,
            id: &ConversationId,
            patch: StatePatch,
        ) -> Result<Option<AgentState>, StoreError> {
            self.inner.update(id, patch).await
        }
        async fn delete(&self, id: &ConversationId) -> Result<(), StoreError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn store_failure_skips_injection_and_retries_the_round() {
        let seeded = planned_store(2).await;
        let store = Arc::new(FlakyStore {
            inner: (*seeded).clone(),
            broken: AtomicBool::new(true),
        });
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let orch = LoopOrchestrator::new(store.clone(), bus);
        let mut cursor = OrchestrationCursor::new(Some(conv()));
        let rounds = vec![round(0, &[("c1", "web_search", "a")])];

        assert_eq!(orch.prepare_step(&mut cursor, &rounds).await, Injection::Skipped);
        assert_eq!(cursor.rounds_processed(), 0);
        assert!(matches!(
            rx.recv().await.unwrap().as_ref(),
            DomainEvent::ErrorOccurred { .. }
        ));

        store.broken.store(false, Ordering::SeqCst);
        assert!(orch.prepare_step(&mut cursor, &rounds).await.is_injected());
        assert_eq!(cursor.rounds_processed(), 1);
        let state = store.load(&conv()).await.unwrap().unwrap();
        assert_eq!(state.completed_steps.len(), 1);
    }

    #[tokio::test]
    async fn replan_policy_only_publishes_a_suggestion() {
        let store = planned_store(3).await;
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let orch = LoopOrchestrator::new(store.clone(), bus)
            .with_replan_policy(Box::new(FailureKeywordReplan::default()));
        let mut cursor = OrchestrationCursor::new(Some(conv()));

        let mut r = Round::new(0);
        r.push("c1", "fetch_url", ToolResult::failure("http_error", "HTTP 500"));
        let before = store.load(&conv()).await.unwrap().unwrap().plan;
        orch.prepare_step(&mut cursor, &[r]).await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event.as_ref(),
            DomainEvent::ReplanSuggested { round: 0, .. }
        ));
        let after = store.load(&conv()).await.unwrap().unwrap().plan.unwrap();
        let before = before.unwrap();
        assert_eq!(before.steps.len(), after.steps.len());
        assert_eq!(before.steps[0].id, after.steps[0].id);
    }

    #[test]
    fn summarize_counts_characters() {
        assert_eq!(summarize(&serde_json::json!("ééé"), 2), "éé");
        assert_eq!(summarize(&serde_json::json!(42), 10), "42");
        assert_eq!(summarize(&serde_json::json!({"a": true}), 3), "{\"a");
    }
}
