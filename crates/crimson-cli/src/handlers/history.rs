//! History command handler.

use anyhow::{Context, Result};
use crimson_core::{InstallItem, InstallStateRepositoryPort};

use crate::bootstrap::CliEnv;

/// Execute the history command, newest first.
pub async fn execute(env: &CliEnv, limit: Option<usize>) -> Result<()> {
    let state = env
        .store()
        .load()
        .await
        .context("Failed to read install state")?;

    if state.history.is_empty() {
        println!("No finished jobs.");
        return Ok(());
    }

    println!(
        "{:<30} {:<10} {:<10} {:<17} Reason",
        "App", "Action", "Status", "Finished"
    );
    println!("{}", "-".repeat(80));
    let limit = limit.unwrap_or(usize::MAX);
    for item in state.history.iter().rev().take(limit) {
        println!("{}", row(item));
    }
    Ok(())
}

fn row(item: &InstallItem) -> String {
    let finished = item.finished_at.map_or_else(
        || "--".to_string(),
        |at| at.format("%Y-%m-%d %H:%M").to_string(),
    );
    format!(
        "{:<30} {:<10} {:<10} {:<17} {}",
        item.app_name(),
        item.action(),
        item.status,
        finished,
        item.failure_reason.as_deref().unwrap_or("")
    )
}
