//! `stepwise run` — plan and run a single task.

use std::sync::Arc;
use std::time::Duration;
use stepwise_agent::{
    AgentLoop, FailureKeywordReplan, LoopOrchestrator, NeverReplan, PlanGenerator, ReplanPolicy,
    StateContextFormatter, StopReason, TaskPlanner,
};
use stepwise_config::{AgentLoopConfig, AppConfig};
use stepwise_core::{AgentState, AgentStatus, Conversation, ConversationId, DomainEvent, EventBus, Message};
use tokio::sync::broadcast;

pub async fn run(
    message: String,
    conversation: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    if !config.has_api_key() {
        return Err(
            "no API key configured: set api_key in ~/.stepwise/config.toml or export STEPWISE_API_KEY"
                .into(),
        );
    }

    let provider = stepwise_providers::build_from_config(&config)?;
    let store = super::open_store(&config).await?;
    let event_bus = Arc::new(EventBus::default());
    let progress = tokio::spawn(print_progress(event_bus.subscribe()));

    let id = conversation
        .map(ConversationId::from)
        .unwrap_or_default();

    let mut planner = TaskPlanner::new(store.clone(), event_bus.clone());
    if config.planner.enabled {
        planner = planner.with_generator(
            PlanGenerator::new(provider.clone(), config.planner_model())
                .with_timeout(Duration::from_secs(config.planner.timeout_secs))
                .with_temperature(config.planner.temperature),
        );
    }
    planner.prepare(&id, &message, None).await?;

    let tools = stepwise_tools::default_registry(
        &config.tools,
        Some((provider.clone(), config.model.clone())),
    );
    let orchestrator = LoopOrchestrator::new(store.clone(), event_bus.clone())
        .with_formatter(StateContextFormatter::new(config.context.max_chars))
        .with_preview_chars(config.context.result_preview_chars)
        .with_replan_policy(replan_policy(&config.agent));

    let agent = AgentLoop::new(provider, config.model.clone(), Arc::new(tools), event_bus)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_system_prompt(config.agent.system_prompt.clone())
        .with_max_rounds(config.agent.max_rounds)
        .with_reasoning_only(config.agent.reasoning_only)
        .with_tool_timeout(Duration::from_secs(config.agent.tool_timeout_secs))
        .with_orchestrator(orchestrator);

    let mut conv = Conversation::with_id(id.clone());
    conv.push(Message::user(message));
    let outcome = agent.run(&mut conv).await?;

    // Dropping the loop closes the bus, which ends the progress printer.
    drop(agent);
    drop(planner);
    let _ = tokio::time::timeout(Duration::from_secs(1), progress).await;

    println!("{}", outcome.answer);
    eprintln!();
    if let Some(state) = store.load(&id).await? {
        eprintln!("{}", plan_summary(&state));
    }
    let reason = match outcome.stop_reason {
        StopReason::FinalAnswer => "final answer",
        StopReason::TextResponse => "text response",
        StopReason::MaxRounds => "round limit",
    };
    eprintln!(
        "Stopped on {reason} after {} round(s), {} tool call(s). Conversation: {id}",
        outcome.rounds, outcome.tool_calls_made
    );
    Ok(())
}

fn replan_policy(config: &AgentLoopConfig) -> Box<dyn ReplanPolicy> {
    if config.replan_hint {
        Box::new(FailureKeywordReplan::default())
    } else {
        Box::new(NeverReplan)
    }
}

async fn print_progress(mut rx: broadcast::Receiver<Arc<DomainEvent>>) {
    loop {
        match rx.recv().await {
            Ok(event) => match event.as_ref() {
                DomainEvent::StatusChanged { status, .. } if *status == AgentStatus::Planning => {
                    eprintln!("  planning...");
                }
                DomainEvent::RoundCompleted {
                    round,
                    max_rounds,
                    actions,
                    ..
                } => {
                    let actions = if actions.is_empty() {
                        "no actions".to_string()
                    } else {
                        actions.join(", ")
                    };
                    eprintln!("  round {}/{max_rounds}: {actions}", round + 1);
                }
                DomainEvent::ReplanSuggested { reason, .. } => {
                    eprintln!("  replan suggested: {reason}");
                }
                _ => {}
            },
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn plan_summary(state: &AgentState) -> String {
    let Some(plan) = &state.plan else {
        return format!("No plan (status: {})", state.status);
    };
    let done = plan.steps.iter().filter(|s| s.is_done()).count();
    let mut out = format!(
        "Plan: {} ({done}/{} steps done, status: {})",
        plan.goal,
        plan.len(),
        state.status
    );
    for (i, step) in plan.steps.iter().enumerate() {
        let mark = if step.is_done() { "x" } else { " " };
        out.push_str(&format!("\n  [{mark}] {}. {}", i + 1, step.description));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_agent::Round;
    use stepwise_core::{AgentPlan, PlanStep, ToolResult};

    fn failing_round_on_planned_state() -> (AgentState, Round) {
        let mut state = AgentState::new("conv".into(), AgentStatus::Executing);
        state.plan = AgentPlan::new("goal", vec![PlanStep::pending("search", None)], "r").ok();
        let mut round = Round::new(0);
        round.push(
            "call_1",
            "web_search",
            ToolResult::failure("missing_api_key", "No search API key configured"),
        );
        (state, round)
    }

    #[test]
    fn replan_hint_selects_failure_keyword_policy() {
        let (state, round) = failing_round_on_planned_state();
        let config = AgentLoopConfig {
            replan_hint: true,
            ..AgentLoopConfig::default()
        };
        assert!(replan_policy(&config).should_replan(&state, &round));
    }

    #[test]
    fn replan_hint_off_never_replans() {
        let (state, round) = failing_round_on_planned_state();
        assert!(!replan_policy(&AgentLoopConfig::default()).should_replan(&state, &round));
    }
}
