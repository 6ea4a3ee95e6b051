//! State context formatter.
//!
//! Renders a conversation's plan, accumulated findings and completed-step
//! log into the block injected before each reasoning call:
//!
//! ```text
//! <agent_state>
//! <plan>
//! Goal: …
//! 1. [DONE] … (tool: web_search)
//!    Result: …
//! 2. [IN_PROGRESS] …
//! 3. [PENDING] …
//! </plan>
//! <accumulated_context>
//! - key: value
//! </accumulated_context>
//! <completed_steps>
//! - description: result
//! </completed_steps>
//! </agent_state>
//! ```
//!
//! The document is built as a small tree of [`Node`]s and rendered in one
//! place, so the size bound can be enforced on the tree's body without
//! re-parsing text. Sizes are counted in characters.

use stepwise_core::state::{AgentPlan, AgentState, AgentStatus, CompletedStep};

/// Hard ceiling on rendered output, in characters.
pub const MAX_CONTEXT_CHARS: usize = 16_000;

/// Smallest accepted ceiling; below it the fixed tags alone would not fit.
pub const MIN_CONTEXT_CHARS: usize = 256;

pub const ROOT_TAG: &str = "agent_state";
pub const TRUNCATION_MARKER: &str = "[... earlier state truncated ...]";

/// A node of the rendered document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `<tag>` children `</tag>`
    Block { tag: &'static str, children: Vec<Node> },
    Line(String),
}

impl Node {
    fn block(tag: &'static str, children: Vec<Node>) -> Self {
        Self::Block { tag, children }
    }

    fn render(&self) -> String {
        match self {
            Self::Line(text) => text.clone(),
            Self::Block { tag, children } => {
                format!("<{tag}>\n{}\n</{tag}>", render_children(children))
            }
        }
    }
}

fn render_children(children: &[Node]) -> String {
    children
        .iter()
        .map(Node::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Step marker derived from the cursor, not from the step's own status.
fn step_marker(index: usize, cursor: usize) -> &'static str {
    match index.cmp(&cursor) {
        std::cmp::Ordering::Less => "DONE",
        std::cmp::Ordering::Equal => "IN_PROGRESS",
        std::cmp::Ordering::Greater => "PENDING",
    }
}

fn plan_section(plan: &AgentPlan, cursor: usize) -> Node {
    let mut lines = vec![Node::Line(format!("Goal: {}", plan.goal))];
    for (i, step) in plan.steps.iter().enumerate() {
        let marker = step_marker(i, cursor);
        let mut line = format!("{}. [{marker}] {}", i + 1, step.description);
        if let Some(tool) = &step.tool {
            line.push_str(&format!(" (tool: {tool})"));
        }
        lines.push(Node::Line(line));
        if marker == "DONE" {
            if let Some(result) = &step.result {
                lines.push(Node::Line(format!("   Result: {result}")));
            }
        }
    }
    Node::block("plan", lines)
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn completed_section(log: &[CompletedStep]) -> Node {
    Node::block(
        "completed_steps",
        log.iter()
            .map(|c| Node::Line(format!("- {}: {}", c.description, c.result)))
            .collect(),
    )
}

/// Build the document tree, or `None` when there is nothing to inject.
pub fn build_document(state: Option<&AgentState>) -> Option<Node> {
    let state = state?;
    if state.status == AgentStatus::Idle {
        return None;
    }

    let mut sections = Vec::new();
    if let Some(plan) = state.plan.as_ref().filter(|p| !p.is_empty()) {
        sections.push(plan_section(plan, state.current_step_index));
    }
    if !state.context.is_empty() {
        sections.push(Node::block(
            "accumulated_context",
            state
                .context
                .iter()
                .map(|(k, v)| Node::Line(format!("- {k}: {}", render_value(v))))
                .collect(),
        ));
    }
    if !state.completed_steps.is_empty() {
        sections.push(completed_section(&state.completed_steps));
    }

    if sections.is_empty() {
        None
    } else {
        Some(Node::block(ROOT_TAG, sections))
    }
}

/// Renders [`AgentState`] under a character ceiling.
#[derive(Debug, Clone, Copy)]
pub struct StateContextFormatter {
    max_chars: usize,
}

impl Default for StateContextFormatter {
    fn default() -> Self {
        Self::new(MAX_CONTEXT_CHARS)
    }
}

impl StateContextFormatter {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(MIN_CONTEXT_CHARS),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Render `state`; empty when absent, idle, or without any section.
    pub fn format(&self, state: Option<&AgentState>) -> String {
        let Some(Node::Block { tag, children }) = build_document(state) else {
            return String::new();
        };

        let body = render_children(&children);
        let open = format!("<{tag}>\n");
        let close = format!("\n</{tag}>");
        let full_len = open.chars().count() + body.chars().count() + close.chars().count();
        if full_len <= self.max_chars {
            return format!("{open}{body}{close}");
        }

        // Keep the newest content: the tail of the body.
        let marker = format!("{TRUNCATION_MARKER}\n");
        let overhead = open.chars().count() + marker.chars().count() + close.chars().count();
        let budget = self.max_chars.saturating_sub(overhead);
        format!("{open}{marker}{}{close}", tail_chars(&body, budget))
    }
}

/// Render with the default 16 000-character ceiling.
pub fn format_state_context(state: Option<&AgentState>) -> String {
    StateContextFormatter::default().format(state)
}

/// The last `n` characters of `text`.
fn tail_chars(text: &str, n: usize) -> &str {
    let total = text.chars().count();
    if n >= total {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}
