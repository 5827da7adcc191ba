//! `turnmark.toml` section definitions.
//!
//! ```toml
//! [markers]
//! container = "article"                      # Selector for turn containers
//! role_attr = "data-message-author-role"     # Attribute carrying the author role
//! user_role = "user"
//! assistant_role = "assistant"
//! user_class = "my-user-msg"                 # Marker class for user turns
//! assistant_class = "my-ai-msg"              # Marker class for assistant turns
//! processed_attr = "data-beautified"         # Processed flag attribute
//!
//! [label]
//! tag = "div"
//! class = "turn-counter-label"
//! template = "Turn {n} of conversation"      # `{n}` is the 1-based ordinal
//!
//! [watch]
//! debounce_ms = 200                          # Settle delay
//! attributes = false                         # Also react to attribute changes
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dom::DEFAULT_PROCESSED_ATTR;

/// Placeholder replaced by the ordinal in label templates.
pub const ORDINAL_PLACEHOLDER: &str = "{n}";

/// How turn containers and their roles are recognized and marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkersConfig {
    /// Compound selector matching one transcript entry.
    pub container: String,
    /// Attribute on a descendant element naming the author.
    pub role_attr: String,
    pub user_role: String,
    pub assistant_role: String,
    pub user_class: String,
    pub assistant_class: String,
    pub processed_attr: String,
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            container: "article".into(),
            role_attr: "data-message-author-role".into(),
            user_role: "user".into(),
            assistant_role: "assistant".into(),
            user_class: "my-user-msg".into(),
            assistant_class: "my-ai-msg".into(),
            processed_attr: DEFAULT_PROCESSED_ATTR.into(),
        }
    }
}

/// The injected ordinal label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub tag: String,
    pub class: String,
    /// Display text; must contain `{n}`.
    pub template: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            tag: "div".into(),
            class: "turn-counter-label".into(),
            template: "Turn {n} of conversation".into(),
        }
    }
}

/// Change watcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period before a burst of mutations triggers a pass.
    pub debounce_ms: u64,
    /// React to attribute changes as well as structural ones.
    pub attributes: bool,
}

impl WatchConfig {
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            attributes: false,
        }
    }
}
