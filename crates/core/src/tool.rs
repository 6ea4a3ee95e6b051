//! Tool trait — the abstraction over the actions the engine may request.
//!
//! The core never looks inside a tool. It only needs the declared names
//! (see [`names`]), the argument schema to advertise, and the result shape.

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The declared tool vocabulary.
///
/// Plan steps may only name tools from [`ALL`](names::ALL); the terminal
/// action [`FINAL_ANSWER`](names::FINAL_ANSWER) also drives the stop policy.
pub mod names {
    pub const WEB_SEARCH: &str = "web_search";
    pub const FETCH_URL: &str = "fetch_url";
    pub const ANALYZE_CONTENT: &str = "analyze_content";
    pub const FINAL_ANSWER: &str = "final_answer";

    pub const ALL: [&str; 4] = [WEB_SEARCH, FETCH_URL, ANALYZE_CONTENT, FINAL_ANSWER];

    /// Whether `name` belongs to the declared vocabulary.
    pub fn is_declared(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the engine's tool_call.id)
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
///
/// Configuration problems and transient upstream failures are reported as
/// a result with `success = false` and `data = {"error", "code"}` rather
/// than as a Rust error, so the engine sees them as a normal observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,
    pub success: bool,
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A successful plain-text result.
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: output.into(),
            data: None,
        }
    }

    /// A successful result with structured data; `output` is its pretty JSON.
    pub fn structured(data: serde_json::Value) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: serde_json::to_string_pretty(&data).unwrap_or_default(),
            data: Some(data),
        }
    }

    /// A structured failure with a stable `code`.
    pub fn failure(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            call_id: String::new(),
            success: false,
            data: Some(serde_json::json!({ "error": message, "code": code })),
            output: message,
        }
    }

    /// The stable error code of a failed result, if any.
    pub fn error_code(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.data.as_ref()?.get("code")?.as_str()
    }

    /// The value folded into accumulated context: structured data when
    /// present, otherwise the text output.
    pub fn payload(&self) -> serde_json::Value {
        match &self.data {
            Some(data) => data.clone(),
            None => serde_json::Value::String(self.output.clone()),
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "web_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the engine).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools, keyed by name.
///
/// Backed by a `BTreeMap` so definitions are advertised in a stable order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call. The returned result carries the call's id.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let result = tool.execute(call.arguments.clone()).await?;
        Ok(result.with_call_id(&call.id))
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}
