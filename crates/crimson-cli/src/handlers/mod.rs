//! Command handlers.
//!
//! Handlers follow the canonical pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//!   (read-only commands take the resolved `CliEnv` instead)
//! - Thin wrappers that:
//!   1. Validate CLI-specific input
//!   2. Call the install manager or read the persisted record
//!   3. Format output for the terminal

pub mod history;
pub mod jobs;
pub mod paths;
pub mod queue;
