//! Annotate command implementation.
//!
//! One-shot: parse the transcript, run the classification and renumber
//! passes once, render the result.

use anyhow::Result;

use super::common::{build_annotator, describe, live_root, load_document, write_output};
use crate::annotate::{Annotator, PassReport, Role};
use crate::cli::AnnotateArgs;
use crate::config::TurnmarkConfig;
use crate::dom::{Tree, render_html};
use crate::{debug, log};

/// Execute annotate command
pub fn run_annotate(args: &AnnotateArgs, config: &TurnmarkConfig) -> Result<()> {
    let annotator = build_annotator(config)?;
    let mut tree = load_document(&args.input, config)?;

    let report = annotate_tree(&annotator, &mut tree);
    let html = render_html(&tree);
    let written = write_output(args.output.as_deref(), &html)?;

    if report.unlabeled > 0 {
        log!(
            "warning";
            "{} user turn(s) lost their label and were skipped",
            report.unlabeled
        );
    }
    let summary = describe(&report, count_users(&annotator, &tree));
    match &args.output {
        Some(path) if written => log!("annotate"; "{}, wrote {}", summary, path.display()),
        Some(path) => log!("annotate"; "{}, {} unchanged", summary, path.display()),
        None => debug!("annotate"; "{}", summary),
    }
    Ok(())
}

/// Run both passes over the live region of `tree`.
pub fn annotate_tree(annotator: &Annotator, tree: &mut Tree) -> PassReport {
    let scope = live_root(tree);
    annotator.run(tree, scope)
}

pub fn count_users(annotator: &Annotator, tree: &Tree) -> usize {
    annotator
        .turns(tree, live_root(tree))
        .iter()
        .filter(|turn| turn.role == Role::User && turn.processed)
        .count()
}
