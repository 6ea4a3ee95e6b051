//! The declared tool vocabulary for Stepwise.
//!
//! Four tools, matching `stepwise_core::tool::names`: web search, single-URL
//! fetch, content analysis and the terminal final answer. Configuration
//! problems (missing keys, bad URLs, upstream failures) come back as
//! `ToolResult::failure` so the engine can react to them.

pub mod analyze_content;
pub mod fetch_url;
pub mod final_answer;
pub mod web_search;

use std::sync::Arc;
use stepwise_config::ToolsConfig;
use stepwise_core::Provider;
use stepwise_core::tool::ToolRegistry;

pub use analyze_content::AnalyzeContentTool;
pub use fetch_url::FetchUrlTool;
pub use final_answer::FinalAnswerTool;
pub use web_search::WebSearchTool;

/// Build a registry holding the full declared vocabulary.
///
/// `analyzer` is the engine used by `analyze_content`; without one the tool
/// still registers and reports `analysis_unavailable`.
pub fn default_registry(
    config: &ToolsConfig,
    analyzer: Option<(Arc<dyn Provider>, String)>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(WebSearchTool::from_config(config)));
    registry.register(Box::new(FetchUrlTool::new(config.fetch_max_chars)));
    registry.register(Box::new(AnalyzeContentTool::new(
        analyzer,
        config.analyze_max_chars,
    )));
    registry.register(Box::new(FinalAnswerTool));
    registry
}

/// Truncate `text` to at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::tool::names;

    #[test]
    fn registry_covers_declared_vocabulary() {
        let registry = default_registry(&ToolsConfig::default(), None);
        for name in names::ALL {
            assert!(registry.contains(name), "missing {name}");
        }
        assert_eq!(registry.names().len(), names::ALL.len());
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), ("hé".to_string(), true));
        assert_eq!(truncate_chars("abc", 3), ("abc".to_string(), false));
    }
}
