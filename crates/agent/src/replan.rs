//! Replan hook.
//!
//! A policy looks at a just-folded round and may flag it. Flagging only
//! produces a `ReplanSuggested` event; plans are never regenerated
//! mid-loop.

use stepwise_core::state::AgentState;

use crate::orchestrator::Round;

pub trait ReplanPolicy: Send + Sync {
    fn should_replan(&self, state: &AgentState, round: &Round) -> bool;
}

/// Never suggests a replan.
pub struct NeverReplan;

impl ReplanPolicy for NeverReplan {
    fn should_replan(&self, _state: &AgentState, _round: &Round) -> bool {
        false
    }
}

/// Flags a round when any result failed or its output mentions a failure
/// keyword.
pub struct FailureKeywordReplan {
    keywords: Vec<String>,
}

impl FailureKeywordReplan {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl Default for FailureKeywordReplan {
    fn default() -> Self {
        Self::new(
            ["error", "failed", "not found", "unable to", "timed out"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }
}

impl ReplanPolicy for FailureKeywordReplan {
    fn should_replan(&self, state: &AgentState, round: &Round) -> bool {
        if state.plan.is_none() {
            return false;
        }
        round.actions.iter().any(|a| {
            if !a.result.success {
                return true;
            }
            let output = a.result.output.to_lowercase();
            self.keywords.iter().any(|k| output.contains(k.as_str()))
        })
    }
}
