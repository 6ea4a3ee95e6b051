//! The plan-guided agent loop — the heart of Stepwise.
//!
//! A run looks like this:
//!
//! 1. **Prepare** — [`TaskPlanner`] resets leftover state and, for tasks the
//!    trigger heuristic considers complex, attaches a plan from the
//!    [`PlanGenerator`] (or the fixed fallback plan).
//! 2. **Loop** — [`AgentLoop`] runs bounded reasoning rounds. Before each
//!    one, the [`LoopOrchestrator`] folds finished rounds into durable
//!    state through the [`StepTracker`] and injects a bounded rendering of
//!    that state.
//! 3. **Stop** — after `max_rounds`, on a `final_answer` call, or on a
//!    plain text reply. Rounds not yet folded are folded once more.

pub mod context;
pub mod loop_runner;
pub mod orchestrator;
pub mod planner;
pub mod replan;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{MAX_CONTEXT_CHARS, StateContextFormatter, format_state_context};
pub use loop_runner::{AgentLoop, DEFAULT_MAX_ROUNDS, LoopOutcome, StopReason};
pub use orchestrator::{
    ActionOutcome, Injection, LoopOrchestrator, OrchestrationCursor, RESULT_PREVIEW_CHARS, Round,
};
pub use planner::{PlanContext, PlanGenerator, TaskPlanner, fallback_plan, should_create_plan};
pub use replan::{FailureKeywordReplan, NeverReplan, ReplanPolicy};
pub use tracker::StepTracker;
