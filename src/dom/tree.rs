//! Arena-backed mutable document tree with mutation observers.
//!
//! Nodes live in a flat `Vec` and are addressed by [`NodeId`]. Removing a
//! node only detaches it; ids stay valid for the lifetime of the tree.
//!
//! Every public mutating call queues [`MutationRecord`]s and delivers them to
//! matching observers when the call returns. [`Tree::batch`] defers delivery
//! until the closure finishes, so a burst of edits arrives as one batch.

use std::fmt;

use rustc_hash::FxHashMap;

use super::mutation::{MutationCallback, MutationRecord, ObserveOptions, Observer, ObserverId};
use super::selector::Selector;
use super::{DEFAULT_PROCESSED_ATTR, NodeId, TurnState};

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The single document root.
    Document,
    Element(Element),
    Text(String),
    /// Comment body without the `<!--`/`-->` delimiters.
    Comment(String),
}

/// Element payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in source order; `None` for bare attributes (`<input disabled>`).
    pub attrs: Vec<(String, Option<String>)>,
    pub turn: TurnState,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            turn: TurnState::default(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_deref().unwrap_or(""))
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    fn matches(&self, selector: &Selector) -> bool {
        if let Some(tag) = &selector.tag
            && *tag != self.tag
        {
            return false;
        }

        if !selector.classes.iter().all(|class| self.has_class(class)) {
            return false;
        }

        selector.attrs.iter().all(|cond| match (self.attr(&cond.name), &cond.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}

struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Slot {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// In-memory document.
pub struct Tree {
    slots: Vec<Slot>,
    /// Markup preceding the root element, e.g. `<!DOCTYPE html>`.
    prolog: Option<String>,
    /// Attribute that mirrors `TurnState::processed` in markup.
    processed_attr: String,
    observers: FxHashMap<ObserverId, Observer>,
    next_observer: u64,
    pending: Vec<MutationRecord>,
    batch_depth: usize,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.slots.len())
            .field("processed_attr", &self.processed_attr)
            .field("observers", &self.observers.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::new(NodeData::Document)],
            prolog: None,
            processed_attr: DEFAULT_PROCESSED_ATTR.to_string(),
            observers: FxHashMap::default(),
            next_observer: 0,
            pending: Vec::new(),
            batch_depth: 0,
        }
    }

    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn prolog(&self) -> Option<&str> {
        self.prolog.as_deref()
    }

    pub fn set_prolog(&mut self, prolog: Option<String>) {
        self.prolog = prolog;
    }

    pub fn processed_attr(&self) -> &str {
        &self.processed_attr
    }

    pub fn set_processed_attr(&mut self, name: &str) {
        self.processed_attr = name.to_ascii_lowercase();
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.slots.get(id.0).map(|slot| &slot.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node(id)? {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.slots.get_mut(id.0).map(|slot| &mut slot.data)? {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.slots.get(id.0) {
            Some(slot) => &slot.children,
            None => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    pub fn turn_state(&self, id: NodeId) -> TurnState {
        self.element(id).map(|e| e.turn).unwrap_or_default()
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is attached to the document.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.slots.len() && self.is_inclusive_ancestor(self.root(), id)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.node(id) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element(_) | NodeData::Document) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// Descendants of `scope` in document (pre-)order, excluding `scope`.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        self.element(id).is_some_and(|e| e.matches(selector))
    }

    /// Elements below `scope` matching `selector`, in document order.
    pub fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.matches(id, selector))
            .collect()
    }

    pub fn query_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&id| self.matches(id, selector))
    }

    /// The `<body>` element, if the document has one.
    pub fn body(&self) -> Option<NodeId> {
        self.query_first(self.root(), &Selector::tag("body"))
    }

    // ========================================================================
    // Node creation (detached, no records)
    // ========================================================================

    fn push(&mut self, data: NodeData) -> NodeId {
        self.slots.push(Slot::new(data));
        NodeId(self.slots.len() - 1)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    /// Deep-copy `node` from another tree into this one, detached.
    pub fn import(&mut self, source: &Tree, node: NodeId) -> Option<NodeId> {
        let data = source.node(node)?.clone();
        if matches!(data, NodeData::Document) {
            return None;
        }
        let id = self.push(data);
        for &child in source.children(node) {
            if let Some(copy) = self.import(source, child) {
                self.slots[copy.0].parent = Some(id);
                self.slots[id.0].children.push(copy);
            }
        }
        Some(id)
    }

    // ========================================================================
    // Structural mutation
    // ========================================================================

    /// Insert `child` under `parent` at `index` (clamped), moving it if attached.
    ///
    /// Returns `false` when the insertion would create a cycle or either
    /// node is invalid.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> bool {
        if parent.0 >= self.slots.len()
            || child.0 >= self.slots.len()
            || child == self.root()
            || self.is_inclusive_ancestor(child, parent)
            || matches!(self.node(parent), Some(NodeData::Text(_) | NodeData::Comment(_)))
        {
            return false;
        }

        self.detach(child);
        let children = &mut self.slots[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.slots[child.0].parent = Some(parent);
        self.pending
            .push(MutationRecord::child_list(parent, vec![child], Vec::new()));
        self.finish();
        true
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child)
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.insert_child(parent, 0, child)
    }

    /// Detach a node from its parent.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let removed = self.detach(id);
        self.finish();
        removed
    }

    /// Replace all children of `parent` with `children`, as one record.
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        if parent.0 >= self.slots.len() {
            return;
        }

        let old = std::mem::take(&mut self.slots[parent.0].children);
        for &id in &old {
            self.slots[id.0].parent = None;
        }

        let mut added = Vec::with_capacity(children.len());
        for child in children {
            if child.0 >= self.slots.len() || self.is_inclusive_ancestor(child, parent) {
                continue;
            }
            self.detach(child);
            self.slots[child.0].parent = Some(parent);
            self.slots[parent.0].children.push(child);
            added.push(child);
        }

        if !old.is_empty() || !added.is_empty() {
            self.pending
                .push(MutationRecord::child_list(parent, added, old));
        }
        self.finish();
    }

    /// Replace the children of `id` with a single text node.
    ///
    /// Returns `false` (and records nothing) when the text is already current.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> bool {
        let current = match self.children(id) {
            [] => Some(String::new()),
            [only] => match self.node(*only) {
                Some(NodeData::Text(existing)) => Some(existing.clone()),
                _ => None,
            },
            _ => None,
        };
        if current.as_deref() == Some(text) {
            return false;
        }

        let node = self.create_text(text);
        self.replace_children(id, vec![node]);
        true
    }

    fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.slots.get(id.0).and_then(|slot| slot.parent) else {
            return false;
        };
        self.slots[parent.0].children.retain(|&c| c != id);
        self.slots[id.0].parent = None;
        self.pending
            .push(MutationRecord::child_list(parent, Vec::new(), vec![id]));
        true
    }

    // ========================================================================
    // Attribute mutation
    // ========================================================================

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: Option<&str>) {
        let Some(element) = self.element_mut(id) else {
            return;
        };

        let value = value.map(str::to_string);
        match element
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) if *existing == value => return,
            Some((_, existing)) => *existing = value,
            None => element.attrs.push((name.to_ascii_lowercase(), value)),
        }

        self.pending.push(MutationRecord::attribute(id, name));
        self.finish();
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let before = element.attrs.len();
        element.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        if element.attrs.len() != before {
            self.pending.push(MutationRecord::attribute(id, name));
            self.finish();
        }
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let Some(element) = self.element(id) else {
            return;
        };
        if element.has_class(class) {
            return;
        }

        let mut classes: Vec<&str> = element.classes().collect();
        classes.push(class);
        let joined = classes.join(" ");
        self.set_attr(id, "class", Some(&joined));
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(element) = self.element(id) else {
            return;
        };
        if !element.has_class(class) {
            return;
        }

        let classes: Vec<&str> = element.classes().filter(|&c| c != class).collect();
        if classes.is_empty() {
            self.remove_attr(id, "class");
        } else {
            let joined = classes.join(" ");
            self.set_attr(id, "class", Some(&joined));
        }
    }

    /// Update the container state; recorded as a change of the processed attribute.
    pub fn set_turn_state(&mut self, id: NodeId, state: TurnState) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        if element.turn == state {
            return;
        }
        element.turn = state;
        let record = MutationRecord::attribute(id, &self.processed_attr);
        self.pending.push(record);
        self.finish();
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Register a callback for mutations under `root`.
    pub fn observe(
        &mut self,
        root: NodeId,
        options: ObserveOptions,
        callback: MutationCallback,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.insert(
            id,
            Observer {
                root,
                options,
                callback,
            },
        );
        id
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Run `f` with delivery deferred until it returns.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        self.finish();
        result
    }

    fn finish(&mut self) {
        if self.batch_depth == 0 {
            self.deliver();
        }
    }

    fn deliver(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let records = std::mem::take(&mut self.pending);
        if self.observers.is_empty() {
            return;
        }

        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.values_mut() {
            let batch: Vec<MutationRecord> = records
                .iter()
                .filter(|record| {
                    observer.options.wants(record) && self.in_scope(observer, record.target)
                })
                .cloned()
                .collect();
            if !batch.is_empty() {
                (observer.callback)(&batch);
            }
        }
        self.observers = observers;
    }

    fn in_scope(&self, observer: &Observer, target: NodeId) -> bool {
        target == observer.root
            || (observer.options.subtree && self.is_inclusive_ancestor(observer.root, target))
    }
}
