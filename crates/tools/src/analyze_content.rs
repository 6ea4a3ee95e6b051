//! Content analysis tool.
//!
//! Hands a block of text plus an instruction to a reasoning engine and
//! returns the engine's analysis.

use async_trait::async_trait;
use std::sync::Arc;
use stepwise_core::error::ToolError;
use stepwise_core::message::Message;
use stepwise_core::provider::{Provider, ProviderRequest};
use stepwise_core::tool::{Tool, ToolResult, names};
use tracing::{debug, warn};

use crate::truncate_chars;

const ANALYST_PROMPT: &str = "You analyze the provided content according to the instruction. \
Be factual and concise. Only use information present in the content.";

pub struct AnalyzeContentTool {
    analyzer: Option<(Arc<dyn Provider>, String)>,
    max_chars: usize,
}

impl AnalyzeContentTool {
    pub fn new(analyzer: Option<(Arc<dyn Provider>, String)>, max_chars: usize) -> Self {
        Self {
            analyzer,
            max_chars,
        }
    }
}

#[async_trait]
impl Tool for AnalyzeContentTool {
    fn name(&self) -> &str {
        names::ANALYZE_CONTENT
    }

    fn description(&self) -> &str {
        "Analyze a block of text (e.g. a fetched page) according to an instruction: summarize, extract facts, compare."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The text to analyze"
                },
                "instruction": {
                    "type": "string",
                    "description": "What to do with the content (default: summarize the key points)"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;
        let instruction = arguments["instruction"]
            .as_str()
            .unwrap_or("Summarize the key points.");

        let Some((provider, model)) = &self.analyzer else {
            return Ok(ToolResult::failure(
                "analysis_unavailable",
                "No analysis engine configured",
            ));
        };

        let (content, truncated) = truncate_chars(content, self.max_chars);
        debug!(chars = content.chars().count(), truncated, "Analyzing content");

        let mut request = ProviderRequest::new(
            model.clone(),
            vec![
                Message::system(ANALYST_PROMPT),
                Message::user(format!("Instruction: {instruction}\n\nContent:\n{content}")),
            ],
        );
        request.temperature = 0.2;

        match provider.complete(request).await {
            Ok(response) => Ok(ToolResult::text(response.message.content)),
            Err(e) => {
                warn!(error = %e, "Content analysis failed");
                Ok(ToolResult::failure("analysis_failed", e.to_string()))
            }
        }
    }
}
