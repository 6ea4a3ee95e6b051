//! Plan generator.
//!
//! One structured-generation call turns a task into an [`AgentPlan`]. Any
//! failure of that call (timeout, provider error, malformed or empty JSON)
//! yields the fixed two-step fallback plan instead of an error.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use stepwise_core::error::ProviderError;
use stepwise_core::message::Message;
use stepwise_core::provider::{Provider, ProviderRequest, ResponseFormat};
use stepwise_core::state::{AgentPlan, MAX_PLAN_STEPS, PlanStep};
use stepwise_core::tool::names;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const FALLBACK_FIRST_STEP: &str = "Analyze the request and gather information";
pub const FALLBACK_SECOND_STEP: &str = "Provide comprehensive response";

const PLANNER_PROMPT: &str = r#"You are a planning assistant. Break the user's task into a short execution plan.

Respond with a single JSON object of this exact shape:
{
  "goal": "one sentence describing the overall goal",
  "steps": [
    {"description": "what to do in this step", "tool": "optional tool name"}
  ],
  "reasoning": "why this plan fits the task"
}

Rules:
- Between 1 and 7 steps, in execution order.
- "tool" must be one of: web_search, fetch_url, analyze_content, final_answer. Omit it when no tool fits.
- The last step should normally use final_answer.
- Keep descriptions short and concrete."#;

/// Optional conversation context for plan generation.
#[derive(Debug, Clone, Default)]
pub struct PlanContext {
    /// The most recent messages, oldest first
    pub recent_messages: Vec<Message>,
    /// Free-form description of the user
    pub user_profile: Option<String>,
}

#[derive(Debug, Error)]
enum GenerationError {
    #[error("plan generation timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("malformed plan: {0}")]
    Malformed(String),
    #[error("plan has no usable steps")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    goal: Option<String>,
    #[serde(default)]
    steps: Vec<RawStep>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    description: String,
    #[serde(default)]
    tool: Option<String>,
}

/// Generates execution plans with a fast reasoning-engine call.
pub struct PlanGenerator {
    provider: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
    temperature: f32,
}

impl PlanGenerator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout: Duration::from_secs(20),
            temperature: 0.2,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Generate a plan for `task`. Never fails: errors produce
    /// [`fallback_plan`].
    pub async fn create_plan(&self, task: &str, context: Option<&PlanContext>) -> AgentPlan {
        match self.try_create_plan(task, context).await {
            Ok(plan) => {
                info!(steps = plan.len(), goal = %plan.goal, "Generated plan");
                plan
            }
            Err(e) => {
                warn!(error = %e, "Plan generation failed, using fallback plan");
                fallback_plan(task, &e.to_string())
            }
        }
    }

    async fn try_create_plan(
        &self,
        task: &str,
        context: Option<&PlanContext>,
    ) -> Result<AgentPlan, GenerationError> {
        let mut request = ProviderRequest::new(
            self.model.clone(),
            vec![
                Message::system(PLANNER_PROMPT),
                Message::user(planning_input(task, context)),
            ],
        );
        request.temperature = self.temperature;
        request.response_format = ResponseFormat::JsonObject;

        debug!(model = %self.model, "Requesting plan");
        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        parse_plan(&response.message.content, task)
    }
}

fn planning_input(task: &str, context: Option<&PlanContext>) -> String {
    let mut input = format!("Task: {task}");
    let Some(context) = context else {
        return input;
    };
    if let Some(profile) = context.user_profile.as_deref().filter(|p| !p.is_empty()) {
        input.push_str(&format!("\n\nAbout the user: {profile}"));
    }
    if !context.recent_messages.is_empty() {
        input.push_str("\n\nRecent conversation:");
        for msg in &context.recent_messages {
            let role = serde_json::to_value(msg.role)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();
            input.push_str(&format!("\n{role}: {}", msg.content));
        }
    }
    input
}

/// Parse the engine's JSON into a plan with fresh step ids.
fn parse_plan(content: &str, task: &str) -> Result<AgentPlan, GenerationError> {
    let json = strip_code_fence(content);
    let raw: RawPlan =
        serde_json::from_str(json).map_err(|e| GenerationError::Malformed(e.to_string()))?;

    let mut steps: Vec<PlanStep> = raw
        .steps
        .into_iter()
        .filter(|s| !s.description.trim().is_empty())
        .map(|s| {
            let tool = s.tool.filter(|t| {
                let declared = names::is_declared(t);
                if !declared && !t.is_empty() {
                    debug!(tool = %t, "Dropping undeclared tool from plan step");
                }
                declared
            });
            PlanStep::pending(s.description.trim(), tool)
        })
        .collect();

    if steps.is_empty() {
        return Err(GenerationError::Empty);
    }
    if steps.len() > MAX_PLAN_STEPS {
        warn!(steps = steps.len(), "Plan too long, keeping the first {MAX_PLAN_STEPS} steps");
        steps.truncate(MAX_PLAN_STEPS);
    }

    let goal = raw
        .goal
        .filter(|g| !g.trim().is_empty())
        .unwrap_or_else(|| task.to_string());
    AgentPlan::new(goal, steps, raw.reasoning.unwrap_or_default())
        .map_err(|e| GenerationError::Malformed(e.to_string()))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// The deterministic two-step plan used when generation fails.
pub fn fallback_plan(task: &str, cause: &str) -> AgentPlan {
    AgentPlan {
        goal: task.to_string(),
        steps: vec![
            PlanStep::pending(FALLBACK_FIRST_STEP, None),
            PlanStep::pending(FALLBACK_SECOND_STEP, Some(names::FINAL_ANSWER.to_string())),
        ],
        reasoning: format!("Fallback plan: plan generation was unavailable ({cause})"),
    }
}
