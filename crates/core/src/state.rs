//! Plan and per-conversation agent state.
//!
//! ```text
//! idle ──attach plan──▶ planning ──▶ executing ──cursor past last step──▶ completed
//!  ▲                                                                        │
//!  └──────────────────────────────── reset ─────────────────────────────────┘
//! ```
//!
//! A plan is fixed once created: steps are never inserted, removed or
//! reordered. The only mutation is a single step's `pending → done`
//! transition together with its result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::message::ConversationId;

/// Upper bound on plan length.
pub const MAX_PLAN_STEPS: usize = 7;

/// Durable lifecycle status of a conversation's agent state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Planning,
    Executing,
    Completed,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single plan step. The transition is one-way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Done,
}

/// One step of an [`AgentPlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Unique within its plan
    pub id: String,
    pub description: String,
    /// Optional name of the action this step expects to use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default)]
    pub status: StepStatus,
    /// Set only once the step is done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl PlanStep {
    /// A new pending step with a fresh identifier.
    pub fn pending(description: impl Into<String>, tool: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            tool,
            status: StepStatus::Pending,
            result: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == StepStatus::Done
    }

    /// Mark the step done with `result`. Returns `false` (and changes
    /// nothing) when the step was already done.
    pub fn mark_done(&mut self, result: impl Into<String>) -> bool {
        if self.is_done() {
            return false;
        }
        self.status = StepStatus::Done;
        self.result = Some(result.into());
        true
    }
}

/// Rejected plan shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanShapeError {
    #[error("a plan needs at least one step")]
    Empty,
    #[error("a plan may have at most {MAX_PLAN_STEPS} steps, got {0}")]
    TooManySteps(usize),
}

/// A short, flat, ordered execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPlan {
    pub goal: String,
    /// Execution order; length 1..=7
    pub steps: Vec<PlanStep>,
    pub reasoning: String,
}

impl AgentPlan {
    /// Build a plan, enforcing the 1..=7 step bound.
    pub fn new(
        goal: impl Into<String>,
        steps: Vec<PlanStep>,
        reasoning: impl Into<String>,
    ) -> Result<Self, PlanShapeError> {
        if steps.is_empty() {
            return Err(PlanShapeError::Empty);
        }
        if steps.len() > MAX_PLAN_STEPS {
            return Err(PlanShapeError::TooManySteps(steps.len()));
        }
        Ok(Self {
            goal: goal.into(),
            steps,
            reasoning: reasoning.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Append-only log entry written when a plan step is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedStep {
    pub step_id: String,
    pub description: String,
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

/// The durable plan state of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub conversation_id: ConversationId,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<AgentPlan>,
    /// Index of the next not-yet-completed step
    #[serde(default)]
    pub current_step_index: usize,
    #[serde(default)]
    pub completed_steps: Vec<CompletedStep>,
    /// Accumulated findings, last write wins per key
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    /// Bumped by the store on every successful update
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentState {
    pub fn new(conversation_id: ConversationId, status: AgentStatus) -> Self {
        let now = Utc::now();
        Self {
            conversation_id,
            status,
            plan: None,
            current_step_index: 0,
            completed_steps: Vec::new(),
            context: BTreeMap::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The step under the cursor, if the cursor is in range.
    pub fn current_step(&self) -> Option<&PlanStep> {
        self.plan.as_ref()?.steps.get(self.current_step_index)
    }

    /// Whether every plan step has been completed.
    pub fn is_plan_finished(&self) -> bool {
        self.plan
            .as_ref()
            .is_some_and(|p| self.current_step_index >= p.steps.len())
    }

    /// Cross-check the cursor, per-step statuses and the completed-step log.
    ///
    /// Neither representation is treated as authoritative; each is
    /// re-derived from the other and every disagreement is reported.
    pub fn consistency_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let Some(plan) = &self.plan else {
            if !self.completed_steps.is_empty() {
                issues.push(format!(
                    "{} completed steps logged without a plan",
                    self.completed_steps.len()
                ));
            }
            return issues;
        };

        if self.current_step_index > plan.steps.len() {
            issues.push(format!(
                "cursor {} is past the end of a {}-step plan",
                self.current_step_index,
                plan.steps.len()
            ));
        }

        for (i, step) in plan.steps.iter().enumerate() {
            let expected_done = i < self.current_step_index;
            if step.is_done() != expected_done {
                issues.push(format!(
                    "step {} ({}) is {:?} but the cursor is at {}",
                    i + 1,
                    step.id,
                    step.status,
                    self.current_step_index
                ));
            }
        }

        let done_ids: Vec<&str> = plan
            .steps
            .iter()
            .filter(|s| s.is_done())
            .map(|s| s.id.as_str())
            .collect();
        let logged_ids: Vec<&str> = self
            .completed_steps
            .iter()
            .map(|c| c.step_id.as_str())
            .collect();
        if done_ids != logged_ids {
            issues.push(format!(
                "completed-step log has {} entries but {} steps are done",
                logged_ids.len(),
                done_ids.len()
            ));
        }

        issues
    }
}
