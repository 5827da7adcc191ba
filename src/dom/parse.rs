//! HTML -> [`Tree`] via `tl`.
//!
//! Text and attribute values are entity-decoded on the way in and
//! re-escaped by the renderer. The processed attribute is lifted out of the
//! attribute list into [`TurnState`](super::TurnState).

use super::tree::Tree;
use super::{DomError, NodeId, TurnState};
use crate::utils::html::{is_raw_text_element, unescape};

/// Parse a document or fragment.
///
/// `processed_attr` names the attribute that carries the processed flag.
pub fn parse_html(html: &str, processed_attr: &str) -> Result<Tree, DomError> {
    let mut tree = Tree::new();
    tree.set_processed_attr(processed_attr);

    let (prolog, body) = split_doctype(html);
    tree.set_prolog(prolog.map(str::to_string));

    let dom = tl::parse(body, tl::ParserOptions::default())
        .map_err(|e| DomError::Parse(format!("{e:?}")))?;
    let parser = dom.parser();

    let root = tree.root();
    for handle in dom.children() {
        if let Some(node) = convert(&mut tree, *handle, parser, false) {
            tree.append_child(root, node);
        }
    }

    Ok(tree)
}

/// Split a leading `<!DOCTYPE ...>` off the input.
fn split_doctype(html: &str) -> (Option<&str>, &str) {
    let trimmed = html.trim_start();
    let is_doctype = trimmed
        .get(..9)
        .is_some_and(|head| head.eq_ignore_ascii_case("<!doctype"));
    if !is_doctype {
        return (None, html);
    }
    match trimmed.find('>') {
        Some(end) => (Some(&trimmed[..=end]), &trimmed[end + 1..]),
        None => (None, html),
    }
}

/// Build a detached subtree for a tl node.
fn convert(
    tree: &mut Tree,
    handle: tl::NodeHandle,
    parser: &tl::Parser,
    raw_text: bool,
) -> Option<NodeId> {
    match handle.get(parser)? {
        tl::Node::Tag(tag) => {
            let name = tag.name().as_utf8_str().to_ascii_lowercase();
            let id = tree.create_element(&name);
            let processed_attr = tree.processed_attr().to_string();

            let mut attrs = Vec::new();
            let mut processed = false;
            for (key, value) in tag.attributes().iter() {
                let key = key.to_ascii_lowercase();
                let value = value.map(|v| unescape(&v).into_owned());
                if key == processed_attr {
                    // Only the exact value written by the classifier counts
                    processed = value.as_deref() == Some("true");
                    continue;
                }
                if attrs.iter().all(|(k, _): &(String, Option<String>)| *k != key) {
                    attrs.push((key, value));
                }
            }
            // `id` and `class` are also exposed separately by tl
            let extra = [
                ("id", tag.attributes().id()),
                ("class", tag.attributes().class()),
            ];
            for (key, value) in extra {
                if let Some(value) = value
                    && attrs.iter().all(|(k, _)| k != key)
                {
                    attrs.push((key.to_string(), Some(unescape(&value.as_utf8_str()).into_owned())));
                }
            }
            for (key, value) in attrs {
                tree.set_attr(id, &key, value.as_deref());
            }
            if processed {
                tree.set_turn_state(id, TurnState::PROCESSED);
            }

            let raw_children = is_raw_text_element(&name);
            for child in tag.children().top().iter() {
                if let Some(node) = convert(tree, *child, parser, raw_children) {
                    tree.append_child(id, node);
                }
            }
            Some(id)
        }
        tl::Node::Raw(bytes) => {
            let text = bytes.as_utf8_str();
            let text = if raw_text {
                text.into_owned()
            } else {
                unescape(&text).into_owned()
            };
            Some(tree.create_text(text))
        }
        tl::Node::Comment(bytes) => {
            let raw = bytes.as_utf8_str();
            let body = raw
                .strip_prefix("<!--")
                .and_then(|s| s.strip_suffix("-->"))
                .unwrap_or(&raw[..]);
            Some(tree.create_comment(body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::tree::NodeData;
    use crate::dom::{DEFAULT_PROCESSED_ATTR, Selector};

    fn parse(html: &str) -> Tree {
        parse_html(html, DEFAULT_PROCESSED_ATTR).unwrap()
    }

    #[test]
    fn test_parse_document_with_doctype() {
        let tree = parse("<!DOCTYPE html><html><body><article>hi</article></body></html>");
        assert_eq!(tree.prolog(), Some("<!DOCTYPE html>"));
        let body = tree.body().unwrap();
        let articles = tree.query_all(body, &Selector::tag("article"));
        assert_eq!(articles.len(), 1);
        assert_eq!(tree.text_content(articles[0]), "hi");
    }

    #[test]
    fn test_parse_fragment_without_body() {
        let tree = parse(r#"<article><div data-message-author-role="user">q</div></article>"#);
        assert!(tree.body().is_none());
        let role = tree
            .query_first(tree.root(), &Selector::attr_eq("data-message-author-role", "user"))
            .unwrap();
        assert_eq!(tree.tag(role), Some("div"));
    }

    #[test]
    fn test_processed_attr_lifted_into_state() {
        let tree = parse(r#"<article data-beautified="true" class="my-ai-msg">a</article>"#);
        let article = tree.query_first(tree.root(), &Selector::tag("article")).unwrap();
        assert!(tree.turn_state(article).processed);
        assert_eq!(tree.attr(article, DEFAULT_PROCESSED_ATTR), None);
        assert!(tree.has_class(article, "my-ai-msg"));
    }

    #[test]
    fn test_processed_attr_requires_true() {
        let tree = parse(
            r#"<article data-beautified="false"></article><article data-beautified="0"></article><article data-beautified></article>"#,
        );
        for article in tree.query_all(tree.root(), &Selector::tag("article")) {
            assert!(!tree.turn_state(article).processed);
            assert_eq!(tree.attr(article, DEFAULT_PROCESSED_ATTR), None);
        }
    }

    #[test]
    fn test_custom_processed_attr() {
        let tree = parse_html(r#"<article data-done="true"></article>"#, "data-done").unwrap();
        let article = tree.query_first(tree.root(), &Selector::tag("article")).unwrap();
        assert!(tree.turn_state(article).processed);
    }

    #[test]
    fn test_entities_decoded() {
        let tree = parse(r#"<p title="a &amp; b">x &lt; y</p>"#);
        let p = tree.query_first(tree.root(), &Selector::tag("p")).unwrap();
        assert_eq!(tree.attr(p, "title"), Some("a & b"));
        assert_eq!(tree.text_content(p), "x < y");
    }

    #[test]
    fn test_comment_body_kept() {
        let tree = parse("<div><!-- note --></div>");
        let div = tree.query_first(tree.root(), &Selector::tag("div")).unwrap();
        let child = tree.children(div)[0];
        assert_eq!(tree.node(child), Some(&NodeData::Comment(" note ".into())));
    }
}
