//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for queueing game installs through legendary.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "crimson")]
#[command(about = "Queue and run game installs through legendary")]
#[command(version)]
pub struct Cli {
    /// Engine binary to run (defaults to `legendary` on PATH)
    #[arg(long = "engine", env = "CRIMSON_ENGINE_PATH", global = true)]
    pub engine: Option<PathBuf>,

    /// Directory holding install state and settings
    #[arg(long = "data-dir", env = "CRIMSON_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
