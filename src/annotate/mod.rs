//! Turn annotation.
//!
//! Two passes over the live document, always run together by [`Annotator::run`]:
//!
//! 1. **Classify**: every unprocessed turn container is checked for a user or
//!    assistant role marker among its descendants. Recognized containers get
//!    their marker class (and lose the other one) and the processed flag;
//!    user containers also get a label as first child. Containers without a marker are left alone and
//!    retried on the next pass.
//! 2. **Renumber**: all user-marked containers, in document order, get their
//!    label rewritten to their 1-based rank. This pass is the only source of
//!    the final ordinals; the counter of pass 1 is provisional.
//!
//! Both passes are idempotent: on a settled document they change nothing.

mod label;
mod role;


pub use label::LabelFormat;
pub use role::Role;

use serde::Serialize;

use crate::config::{LabelConfig, MarkersConfig, TurnmarkConfig};
use crate::dom::{Document, NodeId, Selector, SelectorError, TurnState};

/// What a single [`Annotator::run`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Containers newly classified as user turns.
    pub users: usize,
    /// Containers newly classified as assistant turns.
    pub assistants: usize,
    /// Containers still lacking any role marker.
    pub pending: usize,
    /// Containers already processed by an earlier pass.
    pub skipped: usize,
    /// Labels whose text was rewritten by the renumber pass.
    pub relabeled: usize,
    /// User-marked containers whose label has gone missing.
    pub unlabeled: usize,
}

impl PassReport {
    /// Whether the pass mutated the document.
    pub const fn changed(&self) -> bool {
        self.users + self.assistants + self.relabeled > 0
    }
}

/// One transcript entry, as reported by [`Annotator::turns`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    /// 0-based position among all containers.
    pub index: usize,
    pub role: Role,
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Classifies and labels turn containers.
#[derive(Debug, Clone)]
pub struct Annotator {
    container: Selector,
    user_marker: Selector,
    assistant_marker: Selector,
    user_class: String,
    assistant_class: String,
    label_tag: String,
    label_class: String,
    label: Selector,
    format: LabelFormat,
}

impl Annotator {
    pub fn new(markers: &MarkersConfig, label: &LabelConfig) -> Result<Self, SelectorError> {
        Ok(Self {
            container: Selector::parse(&markers.container)?,
            user_marker: Selector::attr_eq(&markers.role_attr, &markers.user_role),
            assistant_marker: Selector::attr_eq(&markers.role_attr, &markers.assistant_role),
            user_class: markers.user_class.clone(),
            assistant_class: markers.assistant_class.clone(),
            label_tag: label.tag.clone(),
            label_class: label.class.clone(),
            label: Selector::class(&label.class),
            format: LabelFormat::new(&label.template),
        })
    }

    pub fn from_config(config: &TurnmarkConfig) -> Result<Self, SelectorError> {
        Self::new(&config.markers, &config.label)
    }

    /// Classification pass followed by the renumber pass.
    pub fn run<D: Document + ?Sized>(&self, doc: &mut D, scope: NodeId) -> PassReport {
        let mut report = self.classify(doc, scope);
        let (relabeled, unlabeled) = self.renumber(doc, scope);
        report.relabeled = relabeled;
        report.unlabeled = unlabeled;
        report
    }

    /// Classify and mark every unprocessed container under `scope`.
    pub fn classify<D: Document + ?Sized>(&self, doc: &mut D, scope: NodeId) -> PassReport {
        let mut report = PassReport::default();
        // Provisional, local to this pass
        let mut counter = 0;

        for container in doc.query_all(scope, &self.container) {
            if doc.turn_state(container).processed {
                report.skipped += 1;
                continue;
            }

            match self.role_of(doc, container) {
                Role::User => {
                    counter += 1;
                    doc.remove_class(container, &self.assistant_class);
                    doc.add_class(container, &self.user_class);
                    self.insert_label(doc, container, counter);
                    doc.set_turn_state(container, TurnState::PROCESSED);
                    report.users += 1;
                }
                Role::Assistant => {
                    doc.remove_class(container, &self.user_class);
                    doc.add_class(container, &self.assistant_class);
                    doc.set_turn_state(container, TurnState::PROCESSED);
                    report.assistants += 1;
                }
                Role::Unknown => report.pending += 1,
            }
        }

        crate::debug!(
            "annotate";
            "classified {} user, {} assistant ({} pending, {} already processed)",
            report.users, report.assistants, report.pending, report.skipped
        );
        report
    }

    /// Rewrite every user label to its rank. Returns `(relabeled, unlabeled)`.
    pub fn renumber<D: Document + ?Sized>(&self, doc: &mut D, scope: NodeId) -> (usize, usize) {
        let mut relabeled = 0;
        let mut unlabeled = 0;

        let user_turns: Vec<NodeId> = doc
            .query_all(scope, &self.container)
            .into_iter()
            .filter(|&id| doc.has_class(id, &self.user_class))
            .collect();

        for (index, container) in user_turns.into_iter().enumerate() {
            let Some(label) = doc.query_first(container, &self.label) else {
                crate::debug!("annotate"; "user turn {} has no label", index + 1);
                unlabeled += 1;
                continue;
            };
            if doc.set_text(label, &self.format.render(index + 1)) {
                relabeled += 1;
            }
        }

        (relabeled, unlabeled)
    }

    /// Role of a container from the markers in its subtree.
    pub fn role_of<D: Document + ?Sized>(&self, doc: &D, container: NodeId) -> Role {
        Role::from_markers(
            doc.query_first(container, &self.user_marker).is_some(),
            doc.query_first(container, &self.assistant_marker).is_some(),
        )
    }

    /// All containers with their current annotation, in document order.
    pub fn turns<D: Document + ?Sized>(&self, doc: &D, scope: NodeId) -> Vec<Turn> {
        doc.query_all(scope, &self.container)
            .into_iter()
            .enumerate()
            .map(|(index, container)| {
                let processed = doc.turn_state(container).processed;
                let role = if doc.has_class(container, &self.user_class) {
                    Role::User
                } else if doc.has_class(container, &self.assistant_class) {
                    Role::Assistant
                } else {
                    self.role_of(doc, container)
                };
                let label = (role == Role::User)
                    .then(|| doc.query_first(container, &self.label))
                    .flatten()
                    .map(|label| doc.text_content(label));
                Turn {
                    index,
                    role,
                    processed,
                    label,
                }
            })
            .collect()
    }

    fn insert_label<D: Document + ?Sized>(&self, doc: &mut D, container: NodeId, ordinal: usize) {
        let label = doc.create_element(&self.label_tag);
        doc.add_class(label, &self.label_class);
        doc.set_text(label, &self.format.render(ordinal));
        doc.prepend_child(container, label);
    }
}
