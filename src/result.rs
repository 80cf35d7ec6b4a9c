//! Result type for extraction output.

use serde::{Deserialize, Serialize};

/// Content pulled out of a page by a matched rule.
///
/// Rules only locate the body, so `title` and `description` are always
/// empty; they exist so callers can fill them from other sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Page title. Never set by rule extraction.
    pub title: String,

    /// Page description. Never set by rule extraction.
    pub description: String,

    /// Trimmed text of every node the rule's query selected, in document
    /// order, joined with no separator.
    pub text: String,
}

impl Content {
    /// Content holding only a body text.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// True when the query selected nothing with text in it.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.text.is_empty()
    }
}
