//! Install, update, repair, uninstall and move.
//!
//! Enqueues the requested jobs, renders progress until the manager reports
//! that nothing is active, then shuts the manager down. Ctrl-C cancels
//! everything that is still queued or running.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use crimson_core::{InstallAction, InstallItem, InstallStatus};
use crimson_install::InstallManager;
use tokio::sync::Notify;
use tracing::warn;

use crate::bootstrap::CliContext;
use crate::commands::JobRequest;
use crate::progress_view::TerminalProgress;

/// Execute a job command.
///
/// # Errors
///
/// Returns an error if an install has no destination, if no job could be
/// admitted, or if any admitted job did not succeed.
pub async fn execute(ctx: &CliContext, jobs: Vec<JobRequest>) -> Result<()> {
    if let Some(job) = jobs
        .iter()
        .find(|j| j.action == InstallAction::Install && j.install_path.as_os_str().is_empty())
    {
        bail!(
            "No install path for {}; pass --path or set default_install_path in {}",
            job.app_name,
            ctx.env.settings_file.display()
        );
    }

    let view = Arc::new(TerminalProgress::new());
    let idle = view.idle();
    let _subscription = ctx.events.subscribe(view);

    let mut admitted = Vec::new();
    for job in jobs {
        match ctx
            .manager
            .enqueue_install(job.app_name.clone(), job.action, job.install_path)
            .await
        {
            Ok(_) => admitted.push(job.app_name),
            Err(e) => eprintln!("Skipping {}: {}", job.app_name, e.user_message()),
        }
    }

    if admitted.is_empty() {
        ctx.manager.shutdown().await;
        bail!("Nothing to do");
    }

    tokio::select! {
        () = wait_until_idle(&ctx.manager, &idle) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            warn!("Interrupted, cancelling installs");
            ctx.manager.cancel_all().await;
            wait_until_idle(&ctx.manager, &idle).await;
        }
    }
    ctx.manager.shutdown().await;

    let history = ctx.manager.history().await;
    let unsuccessful = count_unsuccessful(&admitted, &history);
    if unsuccessful > 0 {
        bail!("{unsuccessful} of {} job(s) did not succeed", admitted.len());
    }
    Ok(())
}

/// Wait until the manager has no current job.
async fn wait_until_idle(manager: &InstallManager, idle: &Notify) {
    while manager.current_install().await.is_some() {
        idle.notified().await;
    }
}

/// Jobs whose latest history entry is not a success.
fn count_unsuccessful(names: &[String], history: &[InstallItem]) -> usize {
    names
        .iter()
        .filter(|name| {
            history
                .iter()
                .rev()
                .find(|item| item.app_name() == name.as_str())
                .is_none_or(|item| item.status != InstallStatus::Success)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(name: &str, status: InstallStatus) -> InstallItem {
        let mut item = InstallItem::new(name, InstallAction::Install, "/games");
        item.transition(InstallStatus::Processing).unwrap();
        item.transition(status).unwrap();
        item
    }

    #[test]
    fn test_count_unsuccessful_uses_latest_entry() {
        let history = vec![
            finished("A", InstallStatus::Failed),
            finished("B", InstallStatus::Success),
            finished("A", InstallStatus::Success),
        ];
        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];

        // C never reached history
        assert_eq!(count_unsuccessful(&names, &history), 1);
    }
}
