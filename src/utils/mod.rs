//! Shared helpers for the annotator and the CLI.

pub mod html;
pub mod path;
pub mod plural;

pub use plural::plural_count;
