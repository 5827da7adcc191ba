//! Compound selectors for querying the document tree.
//!
//! Only the subset needed to find turn containers and their markers:
//!
//! ```text
//! article                      tag
//! .my-user-msg                 class
//! [data-message-author-role]   attribute present
//! [data-role="user"]           attribute equals
//! div.message[data-role="a"]   compound of the above
//! ```
//!
//! Descendant combinators are not supported; scoping is done by the
//! query itself (`query_all(scope, selector)`).

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected `{found}` at byte {at} in selector `{input}`")]
    Unexpected {
        input: String,
        found: char,
        at: usize,
    },

    #[error("unterminated attribute matcher in selector `{0}`")]
    Unterminated(String),
}

/// Attribute condition inside `[...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrMatch {
    pub name: String,
    /// `None` matches presence only.
    pub value: Option<String>,
}

/// A compound selector: all parts must match the same element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrMatch>,
}

impl Selector {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into().to_ascii_lowercase()),
            ..Self::default()
        }
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self::default().and_class(class)
    }

    pub fn attr_eq(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attrs: vec![AttrMatch {
                name: name.into().to_ascii_lowercase(),
                value: Some(value.into()),
            }],
            ..Self::default()
        }
    }

    pub fn and_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Parse a compound selector such as `article.turn[data-role="user"]`.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let src = input.trim();
        if src.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut selector = Self::default();
        let bytes = src.as_bytes();
        let mut pos = 0;

        // Leading tag name (or `*`)
        let tag_end = scan_ident(src, pos);
        if tag_end > pos {
            selector.tag = Some(src[pos..tag_end].to_ascii_lowercase());
            pos = tag_end;
        } else if bytes[0] == b'*' {
            pos = 1;
        }

        while pos < bytes.len() {
            match bytes[pos] {
                b'.' => {
                    let end = scan_ident(src, pos + 1);
                    if end == pos + 1 {
                        return Err(unexpected(src, pos));
                    }
                    selector.classes.push(src[pos + 1..end].to_string());
                    pos = end;
                }
                b'[' => {
                    let close = src[pos..]
                        .find(']')
                        .map(|i| pos + i)
                        .ok_or_else(|| SelectorError::Unterminated(src.to_string()))?;
                    selector.attrs.push(parse_attr(src, pos + 1, close)?);
                    pos = close + 1;
                }
                _ => return Err(unexpected(src, pos)),
            }
        }

        Ok(selector)
    }
}

/// Parse the inside of `[...]` spanning `start..end`.
fn parse_attr(src: &str, start: usize, end: usize) -> Result<AttrMatch, SelectorError> {
    let inner = &src[start..end];
    let Some((name, value)) = inner.split_once('=') else {
        let name = inner.trim();
        if name.is_empty() || scan_ident(name, 0) != name.len() {
            return Err(unexpected(src, start));
        }
        return Ok(AttrMatch {
            name: name.to_ascii_lowercase(),
            value: None,
        });
    };

    let name = name.trim();
    if name.is_empty() || scan_ident(name, 0) != name.len() {
        return Err(unexpected(src, start));
    }

    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Ok(AttrMatch {
        name: name.to_ascii_lowercase(),
        value: Some(value.to_string()),
    })
}

/// Return the end offset of an identifier starting at `start`.
fn scan_ident(src: &str, start: usize) -> usize {
    src[start..]
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        .map_or(src.len(), |(i, _)| start + i)
}

fn unexpected(src: &str, at: usize) -> SelectorError {
    SelectorError::Unexpected {
        input: src.to_string(),
        found: src[at..].chars().next().unwrap_or(' '),
        at,
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{tag}")?,
            None if self.classes.is_empty() && self.attrs.is_empty() => write!(f, "*")?,
            None => {}
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for attr in &self.attrs {
            match &attr.value {
                Some(value) => write!(f, "[{}=\"{}\"]", attr.name, value)?,
                None => write!(f, "[{}]", attr.name)?,
            }
        }
        Ok(())
    }
}
