//! crimson command-line interface.
//!
//! - `parser` - root CLI definition and global flags
//! - `commands` - subcommands
//! - `bootstrap` - composition root (settings, engine, store, manager)
//! - `progress_view` - terminal rendering of install events
//! - `handlers` - one module per command family

pub mod bootstrap;
pub mod commands;
pub mod handlers;
pub mod parser;
pub mod progress_view;

pub use bootstrap::{CliConfig, CliContext, CliEnv, bootstrap, resolve_env};
pub use commands::{Commands, JobRequest};
pub use parser::Cli;
