//! Command-line interface module.

mod args;
pub mod annotate;
pub mod common;
pub mod query;
pub mod watch;

pub use args::{AnnotateArgs, Cli, Commands, QueryArgs};
