//! The bounded reasoning loop.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stepwise_core::event::{DomainEvent, EventBus};
use stepwise_core::message::{Conversation, Message, MessageToolCall, Role};
use stepwise_core::provider::{Provider, ProviderRequest};
use stepwise_core::tool::{ToolCall, ToolRegistry, ToolResult, names};
use tracing::{debug, info, warn};

use crate::orchestrator::{LoopOrchestrator, OrchestrationCursor, Round};

/// Default bound on reasoning rounds per run.
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The terminal action was called
    FinalAnswer,
    /// The engine answered without requesting actions
    TextResponse,
    /// The round bound was reached
    MaxRounds,
}

/// The result of one [`AgentLoop::run`].
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub answer: String,
    pub stop_reason: StopReason,
    pub rounds: usize,
    pub tool_calls_made: usize,
}

/// Drives reasoning rounds until the stop policy fires.
///
/// Each round: let the orchestrator fold the previous rounds and inject
/// plan state, call the engine, execute any requested actions. The loop
/// stops after `max_rounds` rounds, when a round calls `final_answer`, or
/// when the engine replies with plain text.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    event_bus: Arc<EventBus>,
    system_prompt: Option<String>,
    max_rounds: usize,
    reasoning_only: bool,
    tool_timeout: Duration,
    orchestrator: Option<LoopOrchestrator>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            event_bus,
            system_prompt: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
            reasoning_only: false,
            tool_timeout: Duration::from_secs(30),
            orchestrator: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the round bound. Zero is treated as one.
    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    /// Reasoning-only engines get no actions and no plan injection.
    pub fn with_reasoning_only(mut self, enabled: bool) -> Self {
        self.reasoning_only = enabled;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Make the loop plan-aware.
    pub fn with_orchestrator(mut self, orchestrator: LoopOrchestrator) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    fn ensure_system_prompt(&self, conversation: &mut Conversation) {
        let Some(prompt) = &self.system_prompt else {
            return;
        };
        match conversation.messages.first() {
            Some(first) if first.role == Role::System => {
                conversation.messages[0] = Message::system(prompt.clone());
            }
            _ => conversation.messages.insert(0, Message::system(prompt.clone())),
        }
    }

    /// Run the loop on `conversation`, appending every message it produces.
    ///
    /// Provider failures abort the run; action failures become failed
    /// results the engine sees on its next round.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
    ) -> Result<LoopOutcome, stepwise_core::Error> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.messages.len(),
            max_rounds = self.max_rounds,
            reasoning_only = self.reasoning_only,
            "Starting agent loop"
        );
        self.ensure_system_prompt(conversation);

        let plan_aware = !self.reasoning_only && self.orchestrator.is_some();
        let mut cursor = OrchestrationCursor::new(plan_aware.then(|| conversation.id.clone()));
        let mut rounds: Vec<Round> = Vec::new();
        let mut tool_calls_made = 0;

        let tool_definitions = if self.reasoning_only {
            Vec::new()
        } else {
            self.tools.definitions()
        };

        let mut stop: Option<(StopReason, String)> = None;

        for round_index in 0..self.max_rounds {
            debug!(conversation_id = %conversation.id, round = round_index, "Agent loop round");

            let mut messages = conversation.messages.clone();
            if let (true, Some(orchestrator)) = (plan_aware, &self.orchestrator) {
                let injection = orchestrator.prepare_step(&mut cursor, &rounds).await;
                messages.extend(injection.to_message());
            }

            let mut request = ProviderRequest::new(self.model.clone(), messages);
            request.temperature = self.temperature;
            request.max_tokens = self.max_tokens;
            request.tools = tool_definitions.clone();

            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(conversation_id = %conversation.id, error = %e, "Provider call failed");
                    self.event_bus.publish(DomainEvent::ErrorOccurred {
                        context: format!("agent_loop:{}", conversation.id),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    self.finish(&mut cursor, &rounds).await;
                    return Err(e.into());
                }
            };

            if let Some(usage) = &response.usage {
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    conversation_id: conversation.id.to_string(),
                    model: response.model.clone(),
                    tokens_used: usage.total_tokens,
                    timestamp: Utc::now(),
                });
            }

            if self.reasoning_only || response.message.tool_calls.is_empty() {
                let mut message = response.message;
                message.tool_calls.clear();
                let text = message.content.clone();
                conversation.push(message);
                stop = Some((StopReason::TextResponse, text));
                break;
            }

            let tool_calls = response.message.tool_calls.clone();
            conversation.push(response.message);

            let mut round = Round::new(round_index);
            let mut final_answer = None;
            for tc in &tool_calls {
                let result = self.execute_tool(tc).await;
                conversation.push(Message::tool_result(&tc.id, &result.output));
                if tc.name == names::FINAL_ANSWER {
                    final_answer = Some(answer_from(tc, &result));
                }
                round.push(&tc.id, &tc.name, result);
            }
            tool_calls_made += tool_calls.len();

            self.event_bus.publish(DomainEvent::RoundCompleted {
                conversation_id: conversation.id.to_string(),
                round: round_index,
                max_rounds: self.max_rounds,
                actions: round.action_names().into_iter().map(String::from).collect(),
                timestamp: Utc::now(),
            });
            rounds.push(round);

            if let Some(answer) = final_answer {
                conversation.push(Message::assistant(answer.clone()));
                stop = Some((StopReason::FinalAnswer, answer));
                break;
            }
        }

        let (stop_reason, answer) = stop.unwrap_or_else(|| {
            warn!(
                conversation_id = %conversation.id,
                rounds = self.max_rounds,
                "Max rounds reached without a final answer"
            );
            (StopReason::MaxRounds, max_rounds_answer(conversation, self.max_rounds))
        });

        self.finish(&mut cursor, &rounds).await;

        let rounds_run = match stop_reason {
            StopReason::TextResponse => rounds.len() + 1,
            _ => rounds.len(),
        };
        info!(
            conversation_id = %conversation.id,
            stop_reason = ?stop_reason,
            rounds = rounds_run,
            tool_calls = tool_calls_made,
            "Agent loop finished"
        );

        Ok(LoopOutcome {
            answer,
            stop_reason,
            rounds: rounds_run,
            tool_calls_made,
        })
    }

    async fn finish(&self, cursor: &mut OrchestrationCursor, rounds: &[Round]) {
        if let Some(orchestrator) = &self.orchestrator {
            orchestrator.finish(cursor, rounds).await;
        }
    }

    /// Execute one requested action. Never fails: every problem becomes a
    /// failed [`ToolResult`] carrying a stable code.
    async fn execute_tool(&self, tc: &MessageToolCall) -> ToolResult {
        let start = Instant::now();
        let result = match serde_json::from_str::<serde_json::Value>(&tc.arguments) {
            Err(e) => ToolResult::failure(
                "invalid_arguments",
                format!("Arguments for {} are not valid JSON: {e}", tc.name),
            ),
            Ok(_) if !self.tools.contains(&tc.name) => {
                ToolResult::failure("unknown_tool", format!("Unknown tool: {}", tc.name))
            }
            Ok(arguments) => {
                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments,
                };
                match tokio::time::timeout(self.tool_timeout, self.tools.execute(&call)).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        warn!(tool = %tc.name, error = %e, "Tool execution failed");
                        ToolResult::failure(e.code(), e.to_string())
                    }
                    Err(_) => {
                        warn!(tool = %tc.name, timeout_secs = self.tool_timeout.as_secs(), "Tool timed out");
                        ToolResult::failure(
                            "timeout",
                            format!(
                                "Tool {} timed out after {}s",
                                tc.name,
                                self.tool_timeout.as_secs()
                            ),
                        )
                    }
                }
            }
        };

        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: tc.name.clone(),
            success: result.success,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        result.with_call_id(&tc.id)
    }
}

/// The `answer` argument of a final-answer call, else the tool's output.
fn answer_from(tc: &MessageToolCall, result: &ToolResult) -> String {
    serde_json::from_str::<serde_json::Value>(&tc.arguments)
        .ok()
        .and_then(|args| args["answer"].as_str().map(String::from))
        .unwrap_or_else(|| result.output.clone())
}

fn max_rounds_answer(conversation: &Conversation, max_rounds: usize) -> String {
    conversation
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant && !m.content.trim().is_empty())
        .map(|m| m.content.clone())
        .unwrap_or_else(|| {
            format!("I reached the limit of {max_rounds} rounds before finishing. Please provide further guidance.")
        })
}
