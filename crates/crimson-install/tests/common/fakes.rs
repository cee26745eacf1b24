//! In-memory engine, state store and event recorder.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crimson_core::{
    EngineError, EngineExit, EngineInvocation, EngineRun, InstallEngine, InstallEvent,
    InstallEventHub, InstallEventListener, InstallStateRepositoryPort, InstallStatus,
    PersistedInstallState, RepositoryError, Subscription,
};
use crimson_install::{InstallManager, InstallManagerConfig, InstallManagerDeps, build_install_manager};
use parking_lot::Mutex;

/// How long a test waits for an expected event before failing.
pub const WAIT: Duration = Duration::from_secs(5);

// ── Scripted engine ────────────────────────────────────────────────

/// One step of a scripted engine run.
#[derive(Debug, Clone)]
pub enum Step {
    /// Print a line.
    Line(&'static str),
    /// Pause before the next step.
    Sleep(Duration),
    /// Block until terminated.
    Hang,
    /// Close output and exit.
    Exit(EngineExit),
    /// Panic inside the run.
    Panic,
}

/// Engine that replays per-title scripts.
///
/// Each launch consumes the next script queued for the title; a title with
/// no script left runs until it is terminated.
#[derive(Default)]
pub struct ScriptedEngine {
    scripts: Mutex<HashMap<String, VecDeque<Vec<Step>>>>,
    broken: Mutex<HashSet<String>>,
    launches: Mutex<Vec<EngineInvocation>>,
    terminations: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a script for the next launch of `app_name`.
    pub fn script(&self, app_name: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .entry(app_name.to_string())
            .or_default()
            .push_back(steps);
    }

    /// Make every launch of `app_name` fail.
    pub fn break_launch(&self, app_name: &str) {
        self.broken.lock().insert(app_name.to_string());
    }

    pub fn launches(&self) -> Vec<EngineInvocation> {
        self.launches.lock().clone()
    }

    pub fn launches_of(&self, app_name: &str) -> Vec<EngineInvocation> {
        self.launches
            .lock()
            .iter()
            .filter(|i| i.app_name == app_name)
            .cloned()
            .collect()
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstallEngine for ScriptedEngine {
    async fn launch(&self, invocation: &EngineInvocation) -> Result<Box<dyn EngineRun>, EngineError> {
        if self.broken.lock().contains(&invocation.app_name) {
            return Err(EngineError::Launch("legendary: No such file or directory".to_string()));
        }
        self.launches.lock().push(invocation.clone());

        let steps = self
            .scripts
            .lock()
            .get_mut(&invocation.app_name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| vec![Step::Hang]);

        Ok(Box::new(ScriptedRun {
            steps: steps.into(),
            exit: EngineExit::Success,
            terminations: Arc::clone(&self.terminations),
        }))
    }
}

struct ScriptedRun {
    steps: VecDeque<Step>,
    exit: EngineExit,
    terminations: Arc<AtomicUsize>,
}

#[async_trait]
impl EngineRun for ScriptedRun {
    async fn next_line(&mut self) -> Option<String> {
        while let Some(step) = self.steps.pop_front() {
            match step {
                Step::Line(line) => return Some(line.to_string()),
                Step::Sleep(d) => tokio::time::sleep(d).await,
                Step::Hang => std::future::pending::<()>().await,
                Step::Exit(exit) => {
                    self.exit = exit;
                    return None;
                }
                Step::Panic => panic!("scripted engine panic"),
            }
        }
        None
    }

    async fn wait(&mut self) -> Result<EngineExit, EngineError> {
        Ok(self.exit)
    }

    async fn terminate(&mut self, _grace: Duration) -> Result<(), EngineError> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        self.exit = EngineExit::Aborted;
        Ok(())
    }
}

// ── State store ────────────────────────────────────────────────────

/// State store kept in memory, optionally failing every save.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<PersistedInstallState>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_state(state: PersistedInstallState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            ..Self::default()
        })
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn saved(&self) -> PersistedInstallState {
        self.state.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstallStateRepositoryPort for MemoryStateStore {
    async fn load(&self) -> Result<PersistedInstallState, RepositoryError> {
        Ok(self.state.lock().clone())
    }

    async fn save(&self, state: &PersistedInstallState) -> Result<(), RepositoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("disk full".to_string()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = state.clone();
        Ok(())
    }
}

// ── Event recorder ─────────────────────────────────────────────────

/// Listener that keeps every event it sees.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<InstallEvent>>,
}

impl InstallEventListener for Recorder {
    fn on_event(&self, event: &InstallEvent) {
        self.events.lock().push(event.clone());
    }
}

impl Recorder {
    pub fn events(&self) -> Vec<InstallEvent> {
        self.events.lock().clone()
    }

    /// Status sequence reported for `app_name`, in delivery order.
    pub fn statuses(&self, app_name: &str) -> Vec<InstallStatus> {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, InstallEvent::StatusChanged { .. }))
            .filter_map(InstallEvent::item)
            .filter(|item| item.app_name() == app_name)
            .map(|item| item.status)
            .collect()
    }

    pub fn idle_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, InstallEvent::StatusChanged { item: None }))
            .count()
    }

    pub fn progress_count(&self, app_name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, InstallEvent::Progress { item } if item.app_name() == app_name))
            .count()
    }

    /// Wait until `predicate` holds for the recorded events.
    pub async fn wait_for(&self, what: &str, predicate: impl Fn(&Self) -> bool) {
        let waited = tokio::time::timeout(WAIT, async {
            while !predicate(self) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "timed out waiting for {what}; events: {:#?}", self.events());
    }

    /// Wait until `app_name` has reported `status`.
    pub async fn wait_for_status(&self, app_name: &str, status: InstallStatus) {
        self.wait_for(&format!("{app_name} {status}"), |r| {
            r.statuses(app_name).contains(&status)
        })
        .await;
    }
}

/// Wait until `condition` holds.
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let waited = tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

// ── Harness ────────────────────────────────────────────────────────

/// A running manager wired to fakes.
pub struct Harness {
    pub manager: Arc<InstallManager>,
    pub engine: Arc<ScriptedEngine>,
    pub store: Arc<MemoryStateStore>,
    pub recorder: Arc<Recorder>,
    _subscription: Subscription,
}

/// Config with no progress throttling and a short cancel grace.
pub fn test_config() -> InstallManagerConfig {
    InstallManagerConfig::default()
        .with_progress_interval(Duration::ZERO)
        .with_cancel_grace(Duration::from_millis(50))
}

pub async fn start(engine: Arc<ScriptedEngine>, store: Arc<MemoryStateStore>) -> Harness {
    start_with(engine, store, test_config()).await
}

pub async fn start_with(
    engine: Arc<ScriptedEngine>,
    store: Arc<MemoryStateStore>,
    config: InstallManagerConfig,
) -> Harness {
    let hub = InstallEventHub::new();
    let recorder = Arc::new(Recorder::default());
    let subscription = hub.subscribe(recorder.clone());

    let manager = build_install_manager(InstallManagerDeps {
        engine: engine.clone(),
        store: store.clone(),
        event_emitter: Arc::new(hub),
        config,
    })
    .await;

    Harness {
        manager,
        engine,
        store,
        recorder,
        _subscription: subscription,
    }
}
