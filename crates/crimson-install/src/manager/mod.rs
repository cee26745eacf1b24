//! Install manager implementation.
//!
//! Owns the queue, the single active job and the history, and drives the
//! external engine one job at a time.
//!
//! # Architecture
//!
//! - **Manager**: Validates control calls, mutates state, emits events
//! - **Worker**: Runs one engine invocation, forwards lines, reports the exit
//! - **Line bridge**: Feeds engine lines into the `ProgressReporter` and emits
//!   throttled progress events
//!
//! # Concurrency Model
//!
//! - Single long-lived runner (never resets `runner_started`)
//! - `Notify` for efficient wake-on-work
//! - Lease tokens prevent stale finalize commits
//! - All state sits behind one `tokio::sync::Mutex`; events are emitted after
//!   that guard is released, serialized by `emit_order`

mod config;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crimson_core::{
    EngineExit, EngineInvocation, InstallAction, InstallEngine, InstallError,
    InstallEvent, InstallEventEmitterPort, InstallItem, InstallResult,
    InstallStateRepositoryPort, InstallStatus, PersistedInstallState, STATE_VERSION,
};
use tokio::sync::{Mutex, MutexGuard, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::history::HistoryLog;
use crate::progress::{ProgressReporter, ProgressThrottle};
use crate::queue::InstallQueue;

pub use config::InstallManagerConfig;
pub use worker::{EngineJob, JobOutcome, run_job};

/// Tracing target for job lifecycle logs.
const LOG_TARGET: &str = "crimson.install";

/// Engine lines buffered between the worker and the line bridge.
const LINE_BUFFER: usize = 64;

/// Lease ID for tracking engine runs.
///
/// Used to prevent stale finalize commits when a run is stopped and the job
/// relaunched while the old run is still winding down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LeaseId(u64);

/// State for the engine run currently attached to the current job.
struct ActiveRun {
    /// Unique lease for this execution.
    lease: LeaseId,
    /// Stop signal (child of the shutdown token).
    stop: CancellationToken,
    reporter: ProgressReporter,
    throttle: ProgressThrottle,
}

/// Everything guarded by the manager lock.
struct ManagerState {
    queue: InstallQueue,
    current: Option<InstallItem>,
    /// Engine runs started for `current` so far.
    current_runs: u32,
    active_run: Option<ActiveRun>,
    history: HistoryLog,
}

/// A run claimed by the runner, ready to execute.
struct PreparedRun {
    lease: LeaseId,
    job: EngineJob,
}

/// Read-only view of the whole manager.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallSnapshot {
    /// The job that owns the engine, if any.
    pub current: Option<InstallItem>,
    /// Jobs waiting to start, head first.
    pub queue: Vec<InstallItem>,
    /// Finished jobs, oldest first.
    pub history: Vec<InstallItem>,
}

/// Dependencies for the install manager.
pub struct InstallManagerDeps {
    /// Engine used for every job.
    pub engine: Arc<dyn InstallEngine>,
    /// Where the queue and history are persisted.
    pub store: Arc<dyn InstallStateRepositoryPort>,
    /// Receives status and progress events.
    pub event_emitter: Arc<dyn InstallEventEmitterPort>,
    /// Manager tuning.
    pub config: InstallManagerConfig,
}

/// Single-flight install orchestrator.
///
/// At most one job is `Processing`, `Paused` or `Cancelling` at any time.
/// Control calls return as soon as state is updated; outcomes arrive as
/// [`InstallEvent`]s.
pub struct InstallManager {
    engine: Arc<dyn InstallEngine>,
    store: Arc<dyn InstallStateRepositoryPort>,
    event_emitter: Arc<dyn InstallEventEmitterPort>,
    config: InstallManagerConfig,

    state: Mutex<ManagerState>,
    emit_order: parking_lot::Mutex<()>,
    notify: Notify,
    shutdown: CancellationToken,
    lease_counter: AtomicU64,
    runner_started: AtomicBool,
    runner: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

/// Build an install manager, restore the persisted record and start the runner.
///
/// Jobs that were active when the record was written are moved to history as
/// `Failed` ("interrupted"); jobs that never started are queued again.
pub async fn build_install_manager(deps: InstallManagerDeps) -> Arc<InstallManager> {
    let manager = Arc::new(InstallManager::new(deps));
    manager.restore().await;
    manager.ensure_runner();
    manager
}

impl InstallManager {
    fn new(deps: InstallManagerDeps) -> Self {
        let state = ManagerState {
            queue: InstallQueue::new(),
            current: None,
            current_runs: 0,
            active_run: None,
            history: HistoryLog::new(deps.config.history_limit),
        };

        Self {
            engine: deps.engine,
            store: deps.store,
            event_emitter: deps.event_emitter,
            config: deps.config,
            state: Mutex::new(state),
            emit_order: parking_lot::Mutex::new(()),
            notify: Notify::new(),
            shutdown: CancellationToken::new(),
            lease_counter: AtomicU64::new(1),
            runner_started: AtomicBool::new(false),
            runner: parking_lot::Mutex::new(None),
        }
    }

    // =========================================================================
    // Control API
    // =========================================================================

    /// Admit a job. It starts immediately when nothing else owns the engine.
    ///
    /// Returns the created item as it stands after admission.
    pub async fn enqueue_install(
        &self,
        app_name: impl Into<String>,
        action: InstallAction,
        install_path: impl Into<PathBuf>,
    ) -> InstallResult<InstallItem> {
        if self.shutdown.is_cancelled() {
            return Err(InstallError::other("Install manager is shut down"));
        }

        let item = InstallItem::new(app_name, action, install_path);
        let app_name = item.app_name().to_string();
        let mut events = vec![InstallEvent::status_changed(&item)];

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let active = state.current.as_ref().map(InstallItem::app_name);
        let position = state.queue.enqueue(item, active)?;
        info!(
            target: LOG_TARGET,
            app_name = %app_name,
            action = %action,
            position,
            "Install queued"
        );

        if state.current.is_none() {
            self.promote_next(state, &mut events);
        }

        let created = match &state.current {
            Some(current) if current.app_name() == app_name => current.clone(),
            _ => state
                .queue
                .get(&app_name)
                .cloned()
                .ok_or_else(|| InstallError::other(format!("{app_name} vanished from the queue")))?,
        };

        self.persist(state).await;
        self.commit(guard, events);
        self.notify.notify_one();
        Ok(created)
    }

    /// Cancel a queued or running job. Unknown names are ignored.
    pub async fn cancel_install(&self, app_name: &str) {
        let mut state = self.state.lock().await;
        let mut events = Vec::new();

        if let Some(mut item) = state.queue.remove(app_name) {
            if let Err(e) = item.transition(InstallStatus::Cancelled) {
                warn!(target: LOG_TARGET, app_name, error = %e, "Unexpected queued status");
                return;
            }
            info!(target: LOG_TARGET, app_name, "Queued install cancelled");
            events.push(InstallEvent::status_changed(&item));
            Self::record(&mut state, item);
            self.persist(&state).await;
            self.commit(state, events);
            return;
        }

        let is_current = state
            .current
            .as_ref()
            .is_some_and(|current| current.app_name() == app_name);
        if !is_current {
            debug!(target: LOG_TARGET, app_name, "Cancel of unknown install ignored");
            return;
        }

        if self.cancel_current(&mut state, &mut events) {
            self.persist(&state).await;
        }
        self.commit(state, events);
        self.notify.notify_one();
    }

    /// Cancel every queued job, then the current one.
    pub async fn cancel_all(&self) {
        let mut state = self.state.lock().await;
        let mut events = Vec::new();

        for mut item in state.queue.drain() {
            if item.transition(InstallStatus::Cancelled).is_ok() {
                events.push(InstallEvent::status_changed(&item));
                Self::record(&mut state, item);
            }
        }
        if state.current.is_some() {
            self.cancel_current(&mut state, &mut events);
        }
        info!(target: LOG_TARGET, "All installs cancelled");

        self.persist(&state).await;
        self.commit(state, events);
        self.notify.notify_one();
    }

    /// Pause the current job. Only valid while it is `Processing`.
    ///
    /// The engine is interrupted and relaunched on resume; legendary picks up
    /// from its own resume file, so progress may restart from that checkpoint.
    pub async fn pause_install(&self) -> InstallResult<()> {
        let mut state = self.state.lock().await;
        let ManagerState {
            current,
            active_run,
            ..
        } = &mut *state;

        let status = current.as_ref().map(|item| item.status);
        let Some(item) = current.as_mut().filter(|item| item.is_pausable()) else {
            return Err(InstallError::invalid_transition("pause", status));
        };
        // Flush the last held-back sample before progress freezes
        let mut events = Vec::new();
        if active_run.as_mut().is_some_and(|run| run.throttle.take_held()) {
            events.push(InstallEvent::progress(item));
        }

        item.transition(InstallStatus::Paused)?;
        if let Some(run) = active_run.as_ref() {
            run.stop.cancel();
        }
        info!(target: LOG_TARGET, app_name = %item.app_name(), "Install paused");

        events.push(InstallEvent::status_changed(item));
        self.commit(state, events);
        Ok(())
    }

    /// Resume the paused job. Only valid while it is `Paused`.
    pub async fn resume_install(&self) -> InstallResult<()> {
        let mut state = self.state.lock().await;

        let status = state.current.as_ref().map(|item| item.status);
        let Some(item) = state.current.as_mut().filter(|item| item.is_resumable()) else {
            return Err(InstallError::invalid_transition("resume", status));
        };
        item.transition(InstallStatus::Processing)?;
        info!(target: LOG_TARGET, app_name = %item.app_name(), "Install resumed");

        let events = vec![InstallEvent::status_changed(item)];
        self.commit(state, events);
        self.notify.notify_one();
        Ok(())
    }

    // =========================================================================
    // Read-only projections
    // =========================================================================

    /// Queued titles, head first.
    pub async fn queue_item_names(&self) -> Vec<String> {
        self.state.lock().await.queue.names_in_order()
    }

    /// Finished titles, oldest first.
    pub async fn history_item_names(&self) -> Vec<String> {
        self.state.lock().await.history.names_in_order()
    }

    /// Snapshot of the job that owns the engine.
    pub async fn current_install(&self) -> Option<InstallItem> {
        self.state.lock().await.current.clone()
    }

    /// The current or queued job for `app_name`.
    pub async fn find_item(&self, app_name: &str) -> Option<InstallItem> {
        let state = self.state.lock().await;
        state
            .current
            .as_ref()
            .filter(|item| item.app_name() == app_name)
            .or_else(|| state.queue.get(app_name))
            .cloned()
    }

    /// Finished jobs, oldest first.
    pub async fn history(&self) -> Vec<InstallItem> {
        self.state.lock().await.history.entries()
    }

    /// Current job, queue and history in one consistent view.
    pub async fn snapshot(&self) -> InstallSnapshot {
        let state = self.state.lock().await;
        InstallSnapshot {
            current: state.current.clone(),
            queue: state.queue.iter().cloned().collect(),
            history: state.history.entries(),
        }
    }

    /// Stop the runner, interrupt the engine and write the record.
    ///
    /// A job still running is left as is in the record and reported as
    /// interrupted on the next start.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let runner = self.runner.lock().take();
        if let Some(runner) = runner
            && let Err(e) = runner.await
        {
            warn!(target: LOG_TARGET, error = %e, "Install runner ended abnormally");
        }

        let state = self.state.lock().await;
        self.persist(&state).await;
        info!(target: LOG_TARGET, "Install manager stopped");
    }

    // =========================================================================
    // Runner
    // =========================================================================

    /// Ensure the runner task is started (idempotent).
    fn ensure_runner(self: &Arc<Self>) {
        if self
            .runner_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let manager = Arc::clone(self);
            let handle = tokio::spawn(async move {
                manager.run_loop().await;
            });
            *self.runner.lock() = Some(handle);
        }
    }

    /// Main runner loop: launch the current job whenever it needs an engine.
    async fn run_loop(self: Arc<Self>) {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            if let Some(run) = self.next_run().await {
                self.drive(run).await;
            } else {
                tokio::select! {
                    () = self.notify.notified() => {}
                    () = self.shutdown.cancelled() => break,
                }
            }
        }
        debug!(target: LOG_TARGET, "Install runner exited");
    }

    /// Claim an engine run for the current job, if it needs one.
    async fn next_run(&self) -> Option<PreparedRun> {
        let mut state = self.state.lock().await;
        if state.active_run.is_some() {
            return None;
        }
        let current = state.current.as_ref()?;
        if current.status != InstallStatus::Processing {
            return None;
        }

        let lease = LeaseId(self.lease_counter.fetch_add(1, Ordering::SeqCst));
        let stop = self.shutdown.child_token();
        let invocation = EngineInvocation::for_item(current).resuming(state.current_runs > 0);

        state.current_runs += 1;
        state.active_run = Some(ActiveRun {
            lease,
            stop: stop.clone(),
            reporter: ProgressReporter::new(self.config.speed_window),
            throttle: ProgressThrottle::new(self.config.progress_interval),
        });

        Some(PreparedRun {
            lease,
            job: EngineJob {
                invocation,
                stop,
                grace: self.config.cancel_grace,
            },
        })
    }

    /// Execute one run and commit its outcome.
    ///
    /// The worker runs on its own task so a panic inside the engine adapter
    /// becomes a failed job instead of taking the runner down.
    async fn drive(self: &Arc<Self>, run: PreparedRun) {
        let PreparedRun { lease, job } = run;
        let (line_tx, mut line_rx) = mpsc::channel::<String>(LINE_BUFFER);

        let bridge = {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                while let Some(line) = line_rx.recv().await {
                    manager.apply_engine_line(lease, &line).await;
                }
            })
        };

        let engine = Arc::clone(&self.engine);
        let outcome = match tokio::spawn(run_job(engine, job, line_tx)).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => JobOutcome::Crashed("engine task panicked".to_string()),
            Err(e) => JobOutcome::Crashed(e.to_string()),
        };

        // Every line is applied before the exit is judged
        if let Err(e) = bridge.await {
            warn!(target: LOG_TARGET, error = %e, "Engine line bridge failed");
        }

        self.finalize_run(lease, outcome).await;
    }

    /// Apply one engine line to the current job and emit progress if due.
    async fn apply_engine_line(&self, lease: LeaseId, line: &str) {
        let mut state = self.state.lock().await;
        let ManagerState {
            current,
            active_run,
            ..
        } = &mut *state;

        let (Some(item), Some(run)) = (current.as_mut(), active_run.as_mut()) else {
            return;
        };
        if run.lease != lease || item.status != InstallStatus::Processing {
            return;
        }
        if !run.reporter.apply_line(item, line) || !run.throttle.should_emit() {
            return;
        }

        let events = vec![InstallEvent::progress(item)];
        self.commit(state, events);
    }

    /// Commit the outcome of a run.
    async fn finalize_run(&self, lease: LeaseId, outcome: JobOutcome) {
        let mut state = self.state.lock().await;

        // Verify lease
        let mut run = match state.active_run.take() {
            Some(run) if run.lease == lease => run,
            other => {
                state.active_run = other;
                debug!(target: LOG_TARGET, "Ignoring stale finalize (lease mismatch)");
                return;
            }
        };

        let Some(item) = state.current.as_mut() else {
            return;
        };
        let app_name = item.app_name().to_string();
        let mut events = Vec::new();

        if item.status == InstallStatus::Processing && run.throttle.take_held() {
            events.push(InstallEvent::progress(item));
        }

        let finished = match (item.status, outcome) {
            (InstallStatus::Cancelling, _) => {
                Self::step(item, InstallStatus::Cancelled, &mut events);
                true
            }
            (InstallStatus::Paused | InstallStatus::Processing, JobOutcome::Stopped) => {
                // Paused: wait for resume. Processing: resumed while the
                // stop was in flight, or the manager is shutting down.
                debug!(target: LOG_TARGET, app_name = %app_name, status = %item.status, "Engine run stopped");
                false
            }
            (_, JobOutcome::Exited(EngineExit::Success)) => {
                item.progress_percentage = Some(100.0);
                Self::step(item, InstallStatus::Success, &mut events);
                true
            }
            (_, JobOutcome::Exited(EngineExit::Aborted)) => {
                Self::step(item, InstallStatus::Cancelling, &mut events);
                Self::step(item, InstallStatus::Cancelled, &mut events);
                true
            }
            (_, JobOutcome::Exited(EngineExit::Failed { code })) => {
                let message = run.reporter.last_error().unwrap_or("no diagnostic from engine");
                Self::fail(item, &InstallError::non_zero_exit(code, message), &mut events);
                true
            }
            (_, JobOutcome::LaunchFailed(message)) => {
                Self::fail(item, &InstallError::engine_launch(message), &mut events);
                true
            }
            (_, JobOutcome::Crashed(message)) => {
                Self::fail(item, &InstallError::engine_crash(message), &mut events);
                true
            }
            (status, JobOutcome::Stopped) => {
                warn!(target: LOG_TARGET, app_name = %app_name, %status, "Stopped run for inactive job");
                false
            }
        };

        if finished {
            self.finish_current(&mut state, &mut events);
            self.persist(&state).await;
        }
        self.commit(state, events);
        self.notify.notify_one();
    }

    // =========================================================================
    // State helpers (called with the state lock held)
    // =========================================================================

    /// Cancel the current job. Returns true when it finished immediately.
    fn cancel_current(&self, state: &mut ManagerState, events: &mut Vec<InstallEvent>) -> bool {
        let Some(item) = state.current.as_mut() else {
            return false;
        };

        match item.status {
            InstallStatus::Processing | InstallStatus::Paused => {}
            status => {
                debug!(target: LOG_TARGET, app_name = %item.app_name(), %status, "Cancel already in progress");
                return false;
            }
        }

        Self::step(item, InstallStatus::Cancelling, events);
        info!(target: LOG_TARGET, app_name = %item.app_name(), "Cancelling install");

        if let Some(run) = state.active_run.as_ref() {
            // The run's finalize completes the cancel
            run.stop.cancel();
            return false;
        }

        // No engine attached (paused, or not yet launched)
        Self::step(item, InstallStatus::Cancelled, events);
        self.finish_current(state, events);
        true
    }

    /// Move the terminal current job to history and promote the next one.
    fn finish_current(&self, state: &mut ManagerState, events: &mut Vec<InstallEvent>) {
        let Some(item) = state.current.take() else {
            return;
        };
        info!(
            target: LOG_TARGET,
            app_name = %item.app_name(),
            status = %item.status,
            reason = item.failure_reason.as_deref().unwrap_or(""),
            "Install finished"
        );
        Self::record(state, item);
        self.promote_next(state, events);
    }

    /// Pop the next queued job into `current`, or report idle.
    fn promote_next(&self, state: &mut ManagerState, events: &mut Vec<InstallEvent>) {
        state.current_runs = 0;

        let next = if self.shutdown.is_cancelled() {
            None
        } else {
            state.queue.pop_next()
        };

        match next {
            Some(mut item) => {
                Self::step(&mut item, InstallStatus::Processing, events);
                info!(target: LOG_TARGET, app_name = %item.app_name(), "Install started");
                state.current = Some(item);
            }
            None => {
                state.current = None;
                events.push(InstallEvent::idle());
            }
        }
    }

    fn record(state: &mut ManagerState, item: InstallItem) {
        match state.history.append(item) {
            Ok(pruned) => {
                for old in pruned {
                    debug!(target: LOG_TARGET, app_name = %old.app_name(), "Pruned from history");
                }
            }
            Err(item) => {
                warn!(target: LOG_TARGET, app_name = %item.app_name(), status = %item.status, "Refusing non-terminal history entry");
            }
        }
    }

    /// Transition `item` and queue the matching event.
    fn step(item: &mut InstallItem, next: InstallStatus, events: &mut Vec<InstallEvent>) {
        match item.transition(next) {
            Ok(()) => events.push(InstallEvent::status_changed(item)),
            Err(e) => warn!(target: LOG_TARGET, app_name = %item.app_name(), error = %e, "Rejected transition"),
        }
    }

    fn fail(item: &mut InstallItem, error: &InstallError, events: &mut Vec<InstallEvent>) {
        match item.fail(error.to_string()) {
            Ok(()) => {
                warn!(target: LOG_TARGET, app_name = %item.app_name(), error = %error, "Install failed");
                events.push(InstallEvent::status_changed(item));
            }
            Err(e) => warn!(target: LOG_TARGET, app_name = %item.app_name(), error = %e, "Rejected transition"),
        }
    }

    /// Release the state lock and deliver `events` in order.
    fn commit(&self, state: MutexGuard<'_, ManagerState>, events: Vec<InstallEvent>) {
        let _order = self.emit_order.lock();
        drop(state);
        for event in events {
            self.event_emitter.emit(event);
        }
    }

    /// Write the record. Failures are logged; memory stays authoritative.
    async fn persist(&self, state: &ManagerState) {
        let record = PersistedInstallState {
            version: STATE_VERSION,
            current: state.current.clone(),
            queue: state.queue.iter().cloned().collect(),
            history: state.history.entries(),
        };
        if let Err(e) = self.store.save(&record).await {
            warn!(target: LOG_TARGET, error = %e, "Failed to persist install state");
        }
    }

    /// Load the persisted record into a fresh manager.
    async fn restore(&self) {
        let record = match self.store.load().await {
            Ok(record) => record,
            Err(e) => {
                warn!(target: LOG_TARGET, error = %e, "Failed to load install state, starting empty");
                return;
            }
        };
        if record.is_empty() {
            return;
        }

        let restored = HistoryLog::restore(record, self.config.history_limit);
        let mut state = self.state.lock().await;
        state.history = restored.history;
        for name in &restored.interrupted {
            warn!(target: LOG_TARGET, app_name = %name, "Install was interrupted by the last shutdown");
        }

        let mut events = Vec::new();
        for item in restored.pending {
            let name = item.app_name().to_string();
            match state.queue.enqueue(item, None) {
                Ok(_) => debug!(target: LOG_TARGET, app_name = %name, "Requeued install"),
                Err(e) => warn!(target: LOG_TARGET, app_name = %name, error = %e, "Dropped persisted install"),
            }
        }
        if !state.queue.is_empty() {
            self.promote_next(&mut state, &mut events);
        }

        info!(
            target: LOG_TARGET,
            queued = state.queue.len() + usize::from(state.current.is_some()),
            history = state.history.len(),
            "Install state restored"
        );
        self.persist(&state).await;
        self.commit(state, events);
    }
}
