//! Turnmark - labels the user turns of a chat transcript.

#![allow(dead_code)]

mod annotate;
mod cli;
mod config;
mod dom;
mod logger;
mod utils;
mod watcher;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::TurnmarkConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = TurnmarkConfig::load(&cli)?;
    if let Some(path) = &config.config_path {
        debug!("config"; "loaded {}", path.display());
    }

    match &cli.command {
        Commands::Annotate { args } => cli::annotate::run_annotate(args, &config),
        Commands::Watch { args, .. } => cli::watch::run_watch(args, &config),
        Commands::Query { args } => cli::query::run_query(args, &config),
    }
}
