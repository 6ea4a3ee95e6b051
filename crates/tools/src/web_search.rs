//! Web search tool backed by the Brave Search API.
//!
//! Without an API key the tool still answers, with a `missing_api_key`
//! failure result, so a plan that names it degrades instead of aborting.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use stepwise_config::ToolsConfig;
use stepwise_core::error::ToolError;
use stepwise_core::tool::{Tool, ToolResult, names};
use tracing::{debug, warn};

const MAX_RESULTS: u64 = 10;

pub struct WebSearchTool {
    api_key: Option<String>,
    endpoint: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key,
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(config.search_api_key.clone(), &config.search_endpoint)
    }
}

#[derive(Debug, Clone, Serialize)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

fn parse_results(body: &serde_json::Value, limit: usize) -> Vec<SearchResult> {
    body["web"]["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(limit)
                .map(|item| SearchResult {
                    title: item["title"].as_str().unwrap_or_default().to_string(),
                    url: item["url"].as_str().unwrap_or_default().to_string(),
                    snippet: item["description"].as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        names::WEB_SEARCH
    }

    fn description(&self) -> &str {
        "Search the web for information. Returns a list of relevant results with titles, URLs, and snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default 5, max 10)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let num_results = arguments["num_results"]
            .as_u64()
            .unwrap_or(5)
            .clamp(1, MAX_RESULTS);

        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(ToolResult::failure(
                "missing_api_key",
                "No search API key configured (set STEPWISE_SEARCH_API_KEY)",
            ));
        };

        debug!(query, num_results, "Running web search");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("count", &num_results.to_string())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .timeout(Duration::from_secs(20))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Ok(ToolResult::failure("timeout", format!("Search timed out: {e}")));
            }
            Err(e) => {
                return Ok(ToolResult::failure("network_error", format!("Search failed: {e}")));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Search API returned error");
            return Ok(ToolResult::failure(
                "http_error",
                format!("Search API returned HTTP {}", status.as_u16()),
            ));
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(ToolResult::failure(
                    "http_error",
                    format!("Unreadable search response: {e}"),
                ));
            }
        };

        let results = parse_results(&body, num_results as usize);
        Ok(ToolResult::structured(serde_json::json!({
            "query": query,
            "results": results,
        })))
    }
}
