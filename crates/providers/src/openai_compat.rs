//! Chat-completions provider for OpenAI and compatible servers.
//!
//! Anything that speaks `POST {base}/chat/completions` works: OpenAI,
//! OpenRouter, Ollama, vLLM. Requests are serialized from borrowed views of
//! the domain types, so building a body never clones the conversation.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use stepwise_core::error::ProviderError;
use stepwise_core::message::{Message, MessageToolCall};
use stepwise_core::provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, Usage};
use tracing::{debug, warn};

use wire::{ChatCompletion, ChatRequest};

const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// A reasoning engine reached over an OpenAI-style HTTP API.
pub struct OpenAiCompatProvider {
    name: String,
    endpoint: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        let base_url = base_url.into();
        Ok(Self {
            name: name.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            http,
        })
    }

    /// OpenAI at its public endpoint.
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// A local Ollama server. Ollama ignores the key.
    pub fn ollama(base_url: Option<&str>) -> Result<Self, ProviderError> {
        let base = base_url.unwrap_or("http://localhost:11434/v1");
        Self::new("ollama", base, "ollama")
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn into_response(completion: ChatCompletion) -> Result<ProviderResponse, ProviderError> {
    let Some(choice) = completion.choices.into_iter().next() else {
        return Err(ProviderError::MalformedResponse(
            "response carried no choices".into(),
        ));
    };

    let mut message = Message::assistant(choice.message.content.unwrap_or_default());
    message.tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| MessageToolCall {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();

    Ok(ProviderResponse {
        message,
        usage: completion.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        model: completion.model,
    })
}

/// Map a non-success HTTP status onto the provider error taxonomy.
async fn status_error(response: reqwest::Response) -> ProviderError {
    match response.status() {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            ProviderError::RateLimited { retry_after_secs }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationFailed(
            "the endpoint rejected the API key".into(),
        ),
        status => {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %message, "Provider returned an error status");
            ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::AuthenticationFailed(
                "No API key configured. Set STEPWISE_API_KEY or run `stepwise init`.".into(),
            ));
        }

        let body = ChatRequest::from(&request);
        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            json = request.response_format == ResponseFormat::JsonObject,
            "Sending chat completion"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("undecodable body: {e}")))?;
        into_response(completion)
    }
}

/// Chat-completions wire format.
mod wire {
    use serde::{Deserialize, Serialize};
    use stepwise_core::message::{Message, MessageToolCall, Role};
    use stepwise_core::provider::{ProviderRequest, ResponseFormat, ToolDefinition};

    #[derive(Serialize)]
    pub(super) struct ChatRequest<'a> {
        pub model: &'a str,
        pub messages: Vec<OutgoingMessage<'a>>,
        pub temperature: f32,
        pub stream: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub max_tokens: Option<u32>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub tools: Vec<FunctionTool<'a>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub response_format: Option<FormatSpec>,
    }

    impl<'a> From<&'a ProviderRequest> for ChatRequest<'a> {
        fn from(request: &'a ProviderRequest) -> Self {
            Self {
                model: &request.model,
                messages: request.messages.iter().map(OutgoingMessage::from).collect(),
                temperature: request.temperature,
                stream: false,
                max_tokens: request.max_tokens,
                tools: request.tools.iter().map(FunctionTool::from).collect(),
                response_format: match request.response_format {
                    ResponseFormat::JsonObject => Some(FormatSpec {
                        kind: "json_object",
                    }),
                    ResponseFormat::Text => None,
                },
            }
        }
    }

    #[derive(Serialize)]
    pub(super) struct FormatSpec {
        #[serde(rename = "type")]
        pub kind: &'static str,
    }

    #[derive(Serialize)]
    pub(super) struct OutgoingMessage<'a> {
        pub role: &'static str,
        pub content: &'a str,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub tool_calls: Vec<OutgoingToolCall<'a>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_call_id: Option<&'a str>,
    }

    impl<'a> From<&'a Message> for OutgoingMessage<'a> {
        fn from(message: &'a Message) -> Self {
            Self {
                role: match message.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                },
                content: &message.content,
                tool_calls: message.tool_calls.iter().map(OutgoingToolCall::from).collect(),
                tool_call_id: message.tool_call_id.as_deref(),
            }
        }
    }

    #[derive(Serialize)]
    pub(super) struct OutgoingToolCall<'a> {
        pub id: &'a str,
        #[serde(rename = "type")]
        pub kind: &'static str,
        pub function: OutgoingFunction<'a>,
    }

    impl<'a> From<&'a MessageToolCall> for OutgoingToolCall<'a> {
        fn from(call: &'a MessageToolCall) -> Self {
            Self {
                id: &call.id,
                kind: "function",
                function: OutgoingFunction {
                    name: &call.name,
                    arguments: &call.arguments,
                },
            }
        }
    }

    #[derive(Serialize)]
    pub(super) struct OutgoingFunction<'a> {
        pub name: &'a str,
        pub arguments: &'a str,
    }

    #[derive(Serialize)]
    pub(super) struct FunctionTool<'a> {
        #[serde(rename = "type")]
        pub kind: &'static str,
        pub function: FunctionSpec<'a>,
    }

    impl<'a> From<&'a ToolDefinition> for FunctionTool<'a> {
        fn from(tool: &'a ToolDefinition) -> Self {
            Self {
                kind: "function",
                function: FunctionSpec {
                    name: &tool.name,
                    description: &tool.description,
                    parameters: &tool.parameters,
                },
            }
        }
    }

    #[derive(Serialize)]
    pub(super) struct FunctionSpec<'a> {
        pub name: &'a str,
        pub description: &'a str,
        pub parameters: &'a serde_json::Value,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ChatCompletion {
        #[serde(default)]
        pub model: String,
        pub choices: Vec<Choice>,
        #[serde(default)]
        pub usage: Option<TokenCounts>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Choice {
        pub message: AssistantReply,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct AssistantReply {
        #[serde(default)]
        pub content: Option<String>,
        #[serde(default)]
        pub tool_calls: Vec<RequestedCall>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct RequestedCall {
        pub id: String,
        pub function: RequestedFunction,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct RequestedFunction {
        pub name: String,
        #[serde(default)]
        pub arguments: String,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct TokenCounts {
        pub prompt_tokens: u32,
        pub completion_tokens: u32,
        pub total_tokens: u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::provider::ToolDefinition;

    fn body_of(request: &ProviderRequest) -> serde_json::Value {
        serde_json::to_value(ChatRequest::from(request)).unwrap()
    }

    #[test]
    fn ollama_defaults_to_local_endpoint() {
        let provider = OpenAiCompatProvider::ollama(None).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("x", "https://host/v1/", "k").unwrap();
        assert_eq!(provider.endpoint(), "https://host/v1/chat/completions");
    }

    #[test]
    fn tool_linkage_survives_serialization() {
        let mut assistant = Message::assistant("");
        assistant.tool_calls.push(MessageToolCall {
            id: "call_1".into(),
            name: "web_search".into(),
            arguments: r#"{"query":"rust"}"#.into(),
        });
        let request = ProviderRequest::new(
            "m",
            vec![
                Message::system("You are helpful"),
                assistant,
                Message::tool_result("call_1", "results"),
            ],
        );

        let body = body_of(&request);
        let messages = &body["messages"];
        assert_eq!(messages[0]["role"], "system");
        assert!(messages[0].get("tool_calls").is_none());
        assert_eq!(messages[1]["tool_calls"][0]["type"], "function");
        assert_eq!(messages[1]["tool_calls"][0]["function"]["name"], "web_search");
        assert_eq!(messages[2]["role"], "tool");
        assert_eq!(messages[2]["tool_call_id"], "call_1");
    }

    #[test]
    fn json_format_and_tools_land_in_body() {
        let mut request = ProviderRequest::new("gpt-4o-mini", vec![Message::user("plan")]);
        request.response_format = ResponseFormat::JsonObject;
        request.tools.push(ToolDefinition {
            name: "fetch_url".into(),
            description: "Fetch".into(),
            parameters: serde_json::json!({"type": "object"}),
        });

        let body = body_of(&request);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["tools"][0]["function"]["name"], "fetch_url");
        assert_eq!(body["stream"], false);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn text_request_has_no_response_format() {
        let mut request = ProviderRequest::new("m", vec![Message::user("hi")]);
        request.max_tokens = Some(256);
        let body = body_of(&request);
        assert!(body.get("response_format").is_none());
        assert!(body.get("tools").is_none());
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn parses_tool_call_reply() {
        let raw = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": null,
                "tool_calls": [{"id": "c1", "type": "function",
                    "function": {"name": "web_search", "arguments": "{\"query\":\"x\"}"}}]}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let completion: ChatCompletion = serde_json::from_str(raw).unwrap();
        let response = into_response(completion).unwrap();
        assert_eq!(response.message.content, "");
        assert_eq!(response.message.tool_calls[0].name, "web_search");
        assert_eq!(response.message.tool_calls[0].arguments, r#"{"query":"x"}"#);
        assert_eq!(response.usage.unwrap().total_tokens, 15);
        assert_eq!(response.model, "gpt-4o-mini");
    }

    #[test]
    fn empty_choices_is_malformed() {
        let completion: ChatCompletion =
            serde_json::from_str(r#"{"model":"m","choices":[]}"#).unwrap();
        let err = into_response(completion).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let provider = OpenAiCompatProvider::new("openai", "http://127.0.0.1:9", "").unwrap();
        let err = provider
            .complete(ProviderRequest::new("m", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }
}
