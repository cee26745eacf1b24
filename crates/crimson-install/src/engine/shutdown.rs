//! Interrupt-then-kill termination for the engine child process.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

#[cfg(unix)]
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Stop a child process, escalating to a kill after `grace`.
///
/// # Strategy
/// 1. Send SIGINT (legendary saves its resume state on interrupt)
/// 2. Wait up to `grace` for the process to exit
/// 3. If still running, kill it and wait for reaping
///
/// # Platform behavior
/// - Unix: SIGINT via nix, then SIGKILL via `.kill()`
/// - Windows: Immediately calls `.kill()`
pub async fn interrupt_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        interrupt_unix(child, grace).await
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
        child.kill().await?;
        child.wait().await
    }
}

#[cfg(unix)]
async fn interrupt_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    // Already reaped
    let Some(pid) = child.id() else {
        return child.wait().await;
    };
    let pid = i32::try_from(pid).map_err(io::Error::other)?;

    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGINT) {
        // Process may have already exited
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(grace, child.wait()).await {
        return result;
    }

    tracing::debug!(pid, "Engine ignored interrupt, killing");
    child.kill().await?;
    child.wait().await
}
