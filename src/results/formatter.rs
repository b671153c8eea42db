//! Result list formatting
//!
//! Pure functions from the published display state to what the result list
//! shows. Nothing here touches orchestrator state.

use super::types::{Document, ResultPayload, SearchStatus};
use serde::Serialize;

/// Default snippet length in characters
pub const DEFAULT_SNIPPET_LENGTH: usize = 200;

/// Rendered result list: one summary line plus an entry per document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    pub summary: String,
    pub items: Vec<ItemView>,
}

/// One entry of the result list, keyed by its position in `docs`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub key: usize,
    pub title: String,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

/// Formats the text result list
#[derive(Debug, Clone, Copy)]
pub struct ResultsFormatter {
    snippet_length: usize,
}

impl Default for ResultsFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_SNIPPET_LENGTH)
    }
}

impl ResultsFormatter {
    pub fn new(snippet_length: usize) -> Self {
        Self { snippet_length }
    }

    /// Build the result list, or `None` when another status view is active.
    ///
    /// A missing payload is treated as an empty one.
    pub fn format(
        &self,
        results: Option<&ResultPayload>,
        elapsed: f64,
        status: &SearchStatus,
    ) -> Option<ResultsView> {
        if *status != SearchStatus::All {
            return None;
        }

        let total = results.and_then(|r| r.total).unwrap_or(0);
        let docs = results.map(|r| r.docs.as_slice()).unwrap_or_default();

        Some(ResultsView {
            summary: format!("About {} results in {} seconds", total, elapsed),
            items: docs
                .iter()
                .enumerate()
                .map(|(key, doc)| self.item(key, doc))
                .collect(),
        })
    }

    fn item(&self, key: usize, doc: &Document) -> ItemView {
        let title = doc
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or(doc.url.as_deref())
            .unwrap_or("Untitled")
            .to_string();

        ItemView {
            key,
            title,
            url: doc.url.clone(),
            snippet: doc
                .content
                .as_deref()
                .map(|c| truncate(c, self.snippet_length))
                .filter(|s| !s.is_empty()),
        }
    }
}

/// Format with the default snippet length
pub fn format_results(
    results: Option<&ResultPayload>,
    elapsed: f64,
    status: &SearchStatus,
) -> Option<ResultsView> {
    ResultsFormatter::default().format(results, elapsed, status)
}

/// Collapse whitespace and cut at `max` characters
fn truncate(text: &str, max: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}
