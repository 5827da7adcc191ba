//! Live document tree.
//!
//! ```text
//! dom/
//! ├── selector   # Compound selectors (tag, .class, [attr="v"])
//! ├── mutation   # MutationRecord, ObserveOptions, observer handles
//! ├── tree       # Arena Tree with observer delivery
//! ├── parse      # HTML -> Tree (tl)
//! └── render     # Tree -> HTML
//! ```
//!
//! The annotator and the change watcher only see the [`Document`] trait, so
//! any host able to answer selector queries and deliver mutation batches can
//! drive them. [`Tree`] is the in-memory implementation.

mod mutation;
mod parse;
mod render;
mod selector;
mod tree;

pub use mutation::{MutationCallback, MutationRecord, ObserveOptions, ObserverId};
pub use parse::parse_html;
pub use render::render_html;
pub use selector::{Selector, SelectorError};
pub use tree::Tree;

use thiserror::Error;

/// Attribute used in markup for the processed flag unless configured otherwise.
pub const DEFAULT_PROCESSED_ATTR: &str = "data-beautified";

/// Stable handle to a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Per-container annotation state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnState {
    /// Set once the container has been classified; never cleared.
    pub processed: bool,
}

impl TurnState {
    pub const PROCESSED: Self = Self { processed: true };
}

#[derive(Debug, Error)]
pub enum DomError {
    #[error("failed to parse HTML: {0}")]
    Parse(String),
}

/// Capability interface over a live document.
///
/// Queries return nodes in document order. Mutations made through this
/// trait are visible to observers registered with [`Document::observe`].
pub trait Document {
    fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId>;

    fn query_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId>;

    /// Whether the node is currently attached to the document.
    fn contains(&self, node: NodeId) -> bool;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn add_class(&mut self, node: NodeId, class: &str);

    fn remove_class(&mut self, node: NodeId, class: &str);

    fn turn_state(&self, node: NodeId) -> TurnState;

    fn set_turn_state(&mut self, node: NodeId, state: TurnState);

    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> NodeId;

    fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> bool;

    fn text_content(&self, node: NodeId) -> String;

    /// Replace the node's children with `text`. Returns `false` if unchanged.
    fn set_text(&mut self, node: NodeId, text: &str) -> bool;

    fn observe(
        &mut self,
        root: NodeId,
        options: ObserveOptions,
        callback: MutationCallback,
    ) -> ObserverId;

    fn disconnect(&mut self, observer: ObserverId) -> bool;
}

impl Document for Tree {
    fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        Tree::query_all(self, scope, selector)
    }

    fn query_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        Tree::query_first(self, scope, selector)
    }

    fn contains(&self, node: NodeId) -> bool {
        Tree::contains(self, node)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        Tree::has_class(self, node, class)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        Tree::add_class(self, node, class);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        Tree::remove_class(self, node, class);
    }

    fn turn_state(&self, node: NodeId) -> TurnState {
        Tree::turn_state(self, node)
    }

    fn set_turn_state(&mut self, node: NodeId, state: TurnState) {
        Tree::set_turn_state(self, node, state);
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        Tree::create_element(self, tag)
    }

    fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        Tree::prepend_child(self, parent, child)
    }

    fn text_content(&self, node: NodeId) -> String {
        Tree::text_content(self, node)
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> bool {
        Tree::set_text(self, node, text)
    }

    fn observe(
        &mut self,
        root: NodeId,
        options: ObserveOptions,
        callback: MutationCallback,
    ) -> ObserverId {
        Tree::observe(self, root, options, callback)
    }

    fn disconnect(&mut self, observer: ObserverId) -> bool {
        Tree::disconnect(self, observer)
    }
}
