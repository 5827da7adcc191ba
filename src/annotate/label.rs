//! Label text formatting.

use crate::config::ORDINAL_PLACEHOLDER;

/// Renders "Turn N of conversation" style label text from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFormat {
    template: String,
}

impl LabelFormat {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Text for the 1-based `ordinal`.
    pub fn render(&self, ordinal: usize) -> String {
        self.template
            .replace(ORDINAL_PLACEHOLDER, &ordinal.to_string())
    }
}

impl Default for LabelFormat {
    fn default() -> Self {
        Self::new("Turn {n} of conversation")
    }
}
