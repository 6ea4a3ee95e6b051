//! The terminal action. Calling it ends the loop; the `answer` argument is
//! what the user sees.

use async_trait::async_trait;
use stepwise_core::error::ToolError;
use stepwise_core::tool::{Tool, ToolResult, names};

pub struct FinalAnswerTool;

#[async_trait]
impl Tool for FinalAnswerTool {
    fn name(&self) -> &str {
        names::FINAL_ANSWER
    }

    fn description(&self) -> &str {
        "Deliver the final answer to the user. Call this once the task is complete."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "answer": {
                    "type": "string",
                    "description": "The complete answer for the user"
                }
            },
            "required": ["answer"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let answer = arguments["answer"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'answer' argument".into()))?;
        Ok(ToolResult::text(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_the_answer() {
        let result = FinalAnswerTool
            .execute(serde_json::json!({"answer": "42"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "42");
    }

    #[tokio::test]
    async fn answer_is_required() {
        let err = FinalAnswerTool
            .execute(serde_json::json!({"text": "42"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");
    }
}
