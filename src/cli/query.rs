//! Query command implementation.
//!
//! Prints the transcript's turns as JSON: position, role, processed flag and
//! label text. By default the document is annotated in memory first, so the
//! labels shown are the ones `annotate` would write.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use super::annotate::annotate_tree;
use super::common::{build_annotator, live_root, load_document};
use crate::annotate::{PassReport, Turn};
use crate::cli::QueryArgs;
use crate::config::TurnmarkConfig;
use crate::log;
use crate::utils::plural_count;

/// Result for a queried transcript
#[derive(Debug, Serialize)]
pub struct QueryResult {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PassReport>,
    pub turns: Vec<Turn>,
}

/// Execute query command
pub fn run_query(args: &QueryArgs, config: &TurnmarkConfig) -> Result<()> {
    let result = query_file(args, config)?;
    log!("query"; "found {}", plural_count(result.turns.len(), "turn"));

    let json = to_json(&result, args.pretty)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}

fn query_file(args: &QueryArgs, config: &TurnmarkConfig) -> Result<QueryResult> {
    let annotator = build_annotator(config)?;
    let mut tree = load_document(&args.input, config)?;

    let report = (!args.raw).then(|| annotate_tree(&annotator, &mut tree));
    let turns = annotator.turns(&tree, live_root(&tree));

    Ok(QueryResult {
        path: args.input.display().to_string(),
        report,
        turns,
    })
}

fn to_json(result: &QueryResult, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    })
}
