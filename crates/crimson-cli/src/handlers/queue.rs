//! Queue command handler.
//!
//! Reads the persisted record; does not start the engine.

use anyhow::{Context, Result};
use crimson_core::{InstallItem, InstallStateRepositoryPort};

use crate::bootstrap::CliEnv;

/// Execute the queue command.
pub async fn execute(env: &CliEnv) -> Result<()> {
    let state = env
        .store()
        .load()
        .await
        .context("Failed to read install state")?;

    if state.current.is_none() && state.queue.is_empty() {
        println!("Nothing queued.");
        return Ok(());
    }

    println!("{:<4} {:<30} {:<10} {:<12} Path", "#", "App", "Action", "Status");
    println!("{}", "-".repeat(72));
    if let Some(current) = &state.current {
        println!("{}", row("*", current));
    }
    for (i, item) in state.queue.iter().enumerate() {
        println!("{}", row(&(i + 1).to_string(), item));
    }
    Ok(())
}

fn row(marker: &str, item: &InstallItem) -> String {
    format!(
        "{:<4} {:<30} {:<10} {:<12} {}",
        marker,
        item.app_name(),
        item.action(),
        item.status,
        item.install_path().display()
    )
}
