//! [`Tree`] -> HTML.

use std::fmt::Write;

use super::NodeId;
use super::tree::{NodeData, Tree};
use crate::utils::html::{escape, escape_attr, is_raw_text_element, is_void_element};

/// Serialize the whole document, prolog included.
///
/// Processed containers get `processed_attr="true"` so the flag survives a
/// round trip through markup.
pub fn render_html(tree: &Tree) -> String {
    let mut out = String::new();
    if let Some(prolog) = tree.prolog() {
        out.push_str(prolog);
    }
    for &child in tree.children(tree.root()) {
        render_node(tree, child, false, &mut out);
    }
    out
}

fn render_node(tree: &Tree, id: NodeId, raw_text: bool, out: &mut String) {
    match tree.node(id) {
        Some(NodeData::Element(element)) => {
            let _ = write!(out, "<{}", element.tag);
            for (name, value) in &element.attrs {
                match value {
                    Some(value) => {
                        let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
                    }
                    None => {
                        let _ = write!(out, " {name}");
                    }
                }
            }
            if element.turn.processed {
                let _ = write!(out, " {}=\"true\"", tree.processed_attr());
            }
            out.push('>');

            if is_void_element(&element.tag) {
                return;
            }

            let raw_children = is_raw_text_element(&element.tag);
            for &child in tree.children(id) {
                render_node(tree, child, raw_children, out);
            }
            let _ = write!(out, "</{}>", element.tag);
        }
        Some(NodeData::Text(text)) if raw_text => out.push_str(text),
        Some(NodeData::Text(text)) => out.push_str(&escape(text)),
        Some(NodeData::Comment(text)) => {
            let _ = write!(out, "<!--{text}-->");
        }
        Some(NodeData::Document) | None => {}
    }
}
