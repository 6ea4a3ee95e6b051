//! Single-URL fetch tool.
//!
//! Fetches one http(s) page and returns its readable text. HTML bodies are
//! rendered with `html2text`; the result is capped at `max_chars` characters.

use async_trait::async_trait;
use std::time::Duration;
use stepwise_core::error::ToolError;
use stepwise_core::tool::{Tool, ToolResult, names};
use tracing::debug;

use crate::truncate_chars;

pub struct FetchUrlTool {
    max_chars: usize,
    client: reqwest::Client,
}

impl FetchUrlTool {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        names::FETCH_URL
    }

    fn description(&self) -> &str {
        "Fetch a single web page by URL and return its text content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The http:// or https:// URL to fetch"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let raw = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        let url = match reqwest::Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                return Ok(ToolResult::failure(
                    "invalid_url",
                    format!("Unsupported URL scheme '{}'", url.scheme()),
                ));
            }
            Err(e) => {
                return Ok(ToolResult::failure("invalid_url", format!("Invalid URL '{raw}': {e}")));
            }
        };

        debug!(url = %url, "Fetching URL");

        let response = match self
            .client
            .get(url.clone())
            .timeout(Duration::from_secs(20))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Ok(ToolResult::failure("timeout", format!("Fetching {url} timed out")));
            }
            Err(e) => {
                return Ok(ToolResult::failure("network_error", format!("Fetching {url} failed: {e}")));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(ToolResult::failure(
                "http_error",
                format!("{url} returned HTTP {}", status.as_u16()),
            ));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("html"));

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(ToolResult::failure("network_error", format!("Reading {url} failed: {e}")));
            }
        };

        let text = if is_html { html_to_text(&body) } else { body };
        let (content, truncated) = truncate_chars(&text, self.max_chars);

        Ok(ToolResult::structured(serde_json::json!({
            "url": url.as_str(),
            "status": status.as_u16(),
            "content": content,
            "truncated": truncated,
        })))
    }
}

/// Wrap width handed to the renderer; wide enough that prose is not
/// re-flowed mid-sentence.
const RENDER_WIDTH: usize = 400;

/// Render an HTML document as text: scripts and styles dropped, entities
/// decoded, blank lines removed. Falls back to the raw body if the renderer
/// rejects the input.
pub fn html_to_text(html: &str) -> String {
    let rendered = match html2text::from_read(html.as_bytes(), RENDER_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "HTML rendering failed, keeping raw body");
            html.to_string()
        }
    };
    rendered
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
