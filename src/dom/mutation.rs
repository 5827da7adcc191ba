//! Mutation records and observer registrations.

use super::NodeId;

/// What changed on a target node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were inserted and/or removed.
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// An attribute was set or removed.
    Attribute { name: String },
}

/// A single mutation, delivered to observers in batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

impl MutationRecord {
    pub(super) fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            target,
            kind: MutationKind::ChildList { added, removed },
        }
    }

    pub(super) fn attribute(target: NodeId, name: &str) -> Self {
        Self {
            target,
            kind: MutationKind::Attribute {
                name: name.to_string(),
            },
        }
    }

    pub fn is_child_list(&self) -> bool {
        matches!(self.kind, MutationKind::ChildList { .. })
    }
}

/// Which mutation kinds an observer wants, and how deep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Report child insertions/removals.
    pub child_list: bool,
    /// Extend reporting to every descendant of the observed root.
    pub subtree: bool,
    /// Report attribute changes.
    pub attributes: bool,
}

impl ObserveOptions {
    /// Structural changes anywhere below the root.
    pub const fn structural() -> Self {
        Self {
            child_list: true,
            subtree: true,
            attributes: false,
        }
    }

    pub const fn with_attributes(mut self, attributes: bool) -> Self {
        self.attributes = attributes;
        self
    }

    pub(super) fn wants(&self, record: &MutationRecord) -> bool {
        match record.kind {
            MutationKind::ChildList { .. } => self.child_list,
            MutationKind::Attribute { .. } => self.attributes,
        }
    }
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self::structural()
    }
}

/// Handle returned by `observe`, used to disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(super) u64);

/// Callback invoked with each delivered batch.
pub type MutationCallback = Box<dyn FnMut(&[MutationRecord]) + Send>;

pub(super) struct Observer {
    pub(super) root: NodeId,
    pub(super) options: ObserveOptions,
    pub(super) callback: MutationCallback,
}
