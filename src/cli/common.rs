//! Common utilities shared across CLI commands.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::annotate::{Annotator, PassReport};
use crate::config::TurnmarkConfig;
use crate::dom::{NodeId, Tree, parse_html};
use crate::utils::plural_count;

/// Read and parse an HTML transcript.
pub fn load_document(path: &Path, config: &TurnmarkConfig) -> Result<Tree> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(&html, config).with_context(|| format!("in {}", path.display()))
}

pub fn parse_document(html: &str, config: &TurnmarkConfig) -> Result<Tree> {
    Ok(parse_html(html, &config.markers.processed_attr)?)
}

/// The region turns are searched in: `<body>` when present.
pub fn live_root(tree: &Tree) -> NodeId {
    tree.body().unwrap_or(tree.root())
}

pub fn build_annotator(config: &TurnmarkConfig) -> Result<Annotator> {
    Annotator::from_config(config).context("invalid markers.container selector")
}

/// Write `content` to `path` unless it already holds exactly that.
///
/// Returns whether the file was written.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        return Ok(false);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

/// Write to `output`, or to stdout when no output file is given.
pub fn write_output(output: Option<&Path>, content: &str) -> Result<bool> {
    match output {
        Some(path) => write_if_changed(path, content),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
            Ok(true)
        }
    }
}

/// One-line summary of a pass for logs and watch status.
pub fn describe(report: &PassReport, total_users: usize) -> String {
    let mut summary = plural_count(total_users, "user turn");
    if report.users + report.assistants > 0 {
        summary.push_str(&format!(
            ", {} newly classified",
            report.users + report.assistants
        ));
    }
    if report.relabeled > 0 {
        summary.push_str(&format!(", {}", plural_count(report.relabeled, "label")));
        summary.push_str(" renumbered");
    }
    if report.pending > 0 {
        summary.push_str(&format!(", {} awaiting a role marker", report.pending));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_if_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.html");

        assert!(write_if_changed(&path, "<p>a</p>").unwrap());
        assert!(!write_if_changed(&path, "<p>a</p>").unwrap());
        assert!(write_if_changed(&path, "<p>b</p>").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>b</p>");
    }

    #[test]
    fn test_load_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("missing.html"), &TurnmarkConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_live_root_prefers_body() {
        let config = TurnmarkConfig::default();
        let tree = parse_document("<html><body><article></article></body></html>", &config)
            .unwrap();
        assert_eq!(tree.tag(live_root(&tree)), Some("body"));

        let fragment = parse_document("<article></article>", &config).unwrap();
        assert_eq!(live_root(&fragment), fragment.root());
    }

    #[test]
    fn test_describe() {
        let report = PassReport {
            users: 1,
            assistants: 1,
            pending: 1,
            relabeled: 0,
            ..PassReport::default()
        };
        assert_eq!(
            describe(&report, 2),
            "2 user turns, 2 newly classified, 1 awaiting a role marker"
        );
        assert_eq!(describe(&PassReport::default(), 1), "1 user turn");

        let renumbered = PassReport {
            relabeled: 3,
            ..PassReport::default()
        };
        assert_eq!(describe(&renumbered, 3), "3 user turns, 3 labels renumbered");
    }
}
