//! Engine run pipeline.
//!
//! Runs one engine invocation to completion, isolated from the manager's
//! state. The worker never touches the queue or emits events; it forwards
//! output lines through a channel and reports how the run ended.
//!
//! # Design Principles
//!
//! - Worker receives an `EngineJob` (value type) and a cloned engine `Arc`
//! - Output lines go to an `mpsc::Sender`, drained by the manager's bridge
//! - Stop requests are handled via `tokio::select!` around every engine await

use std::sync::Arc;
use std::time::Duration;

use crimson_core::{EngineExit, EngineInvocation, EngineRun, InstallEngine};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One engine run to execute.
#[derive(Debug, Clone)]
pub struct EngineJob {
    /// What to ask the engine to do.
    pub invocation: EngineInvocation,
    /// Cancelled by the manager on pause, cancel or shutdown.
    pub stop: CancellationToken,
    /// How long the engine gets to exit after an interrupt.
    pub grace: Duration,
}

/// How a run ended, from the worker's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The engine exited on its own.
    Exited(EngineExit),
    /// The manager asked the run to stop and the engine is gone.
    Stopped,
    /// The engine could not be started.
    LaunchFailed(String),
    /// Waiting on the engine failed, or the run task died.
    Crashed(String),
}

/// Run a job to completion.
pub async fn run_job(
    engine: Arc<dyn InstallEngine>,
    job: EngineJob,
    lines: mpsc::Sender<String>,
) -> JobOutcome {
    if job.stop.is_cancelled() {
        return JobOutcome::Stopped;
    }

    let mut run = match engine.launch(&job.invocation).await {
        Ok(run) => run,
        Err(e) => return JobOutcome::LaunchFailed(e.to_string()),
    };

    loop {
        tokio::select! {
            biased;

            () = job.stop.cancelled() => {
                return stop_run(run.as_mut(), job.grace).await;
            }

            line = run.next_line() => {
                let Some(line) = line else { break };
                // A full channel must not delay a stop
                tokio::select! {
                    biased;

                    () = job.stop.cancelled() => {
                        return stop_run(run.as_mut(), job.grace).await;
                    }

                    sent = lines.send(line) => {
                        if sent.is_err() {
                            debug!(app_name = %job.invocation.app_name, "Line consumer gone");
                        }
                    }
                }
            }
        }
    }

    tokio::select! {
        biased;

        () = job.stop.cancelled() => stop_run(run.as_mut(), job.grace).await,

        exit = run.wait() => match exit {
            Ok(exit) => JobOutcome::Exited(exit),
            Err(e) => JobOutcome::Crashed(e.to_string()),
        },
    }
}

async fn stop_run(run: &mut dyn EngineRun, grace: Duration) -> JobOutcome {
    if let Err(e) = run.terminate(grace).await {
        warn!(error = %e, "Failed to terminate engine");
    }
    JobOutcome::Stopped
}
