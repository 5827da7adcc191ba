//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Chat transcript turn annotator
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: turnmark.toml, searched upward from cwd)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Label user turns in an HTML transcript once
    #[command(visible_alias = "a")]
    Annotate {
        #[command(flatten)]
        args: AnnotateArgs,
    },

    /// Keep an HTML transcript annotated while it changes on disk
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        args: AnnotateArgs,

        /// Settle delay in milliseconds before re-annotating
        #[arg(short, long, value_name = "MS")]
        debounce: Option<u64>,

        /// Also re-annotate on attribute changes, not only on inserted or removed nodes
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        attributes: Option<bool>,
    },

    /// Print the turns of a transcript as JSON
    #[command(visible_alias = "q")]
    Query {
        #[command(flatten)]
        args: QueryArgs,
    },
}

/// Shared arguments for Annotate and Watch commands
#[derive(clap::Args, Debug, Clone)]
pub struct AnnotateArgs {
    /// HTML transcript to annotate
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Write the annotated document here instead of stdout (may equal INPUT)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

/// Query command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    /// HTML transcript to inspect
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pub pretty: bool,

    /// Report the document as found, without annotating it first
    #[arg(short, long)]
    pub raw: bool,
}
