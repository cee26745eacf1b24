//! Terminal rendering of install events.

use std::sync::Arc;

use crimson_core::{InstallEvent, InstallEventListener, InstallItem, InstallStatus, format_mib};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Renders one progress bar for the running job and a line per outcome.
///
/// Bars draw to stdout; logs go to stderr.
pub struct TerminalProgress {
    bar: Mutex<Option<(String, ProgressBar)>>,
    idle: Arc<Notify>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Signalled each time the manager reports that no job is active.
    pub fn idle(&self) -> Arc<Notify> {
        Arc::clone(&self.idle)
    }

    fn create_bar(item: &InstallItem) -> ProgressBar {
        let pb = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stdout());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb.set_message(format!("{} {}", item.action().progressive(), item.app_name()));
        pb
    }

    fn on_status(&self, item: &InstallItem) {
        let mut slot = self.bar.lock();
        let name = item.app_name();

        match item.status {
            InstallStatus::Pending => print_line(slot.as_ref(), &format!("Queued {name}")),
            InstallStatus::Processing => {
                if slot.as_ref().is_none_or(|(current, _)| current != name) {
                    if let Some((_, old)) = slot.take() {
                        old.abandon();
                    }
                    *slot = Some((name.to_string(), Self::create_bar(item)));
                }
            }
            InstallStatus::Paused => {
                if let Some((_, pb)) = slot.as_ref() {
                    pb.set_message(format!("Paused {name}"));
                }
            }
            InstallStatus::Cancelling => {
                if let Some((_, pb)) = slot.as_ref() {
                    pb.set_message(format!("Cancelling {name}"));
                }
            }
            InstallStatus::Success | InstallStatus::Failed | InstallStatus::Cancelled => {
                if slot.as_ref().is_some_and(|(current, _)| current == name) {
                    if let Some((_, pb)) = slot.take() {
                        pb.finish_and_clear();
                    }
                }
                print_line(slot.as_ref(), &outcome_line(item));
            }
        }
    }

    fn on_progress(&self, item: &InstallItem) {
        let slot = self.bar.lock();
        let Some((current, pb)) = slot.as_ref() else {
            return;
        };
        if current != item.app_name() {
            return;
        }

        if let Some(pct) = item.progress_percentage {
            // Clamped to [0, 100] upstream
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let position = pct.round() as u64;
            pb.set_position(position);
        }
        pb.set_message(progress_message(item));
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallEventListener for TerminalProgress {
    fn on_event(&self, event: &InstallEvent) {
        match event {
            InstallEvent::StatusChanged { item: Some(item) } => self.on_status(item),
            InstallEvent::StatusChanged { item: None } => self.idle.notify_one(),
            InstallEvent::Progress { item } => self.on_progress(item),
        }
    }
}

/// Print above the live bar, if any.
fn print_line(bar: Option<&(String, ProgressBar)>, line: &str) {
    match bar {
        Some((_, pb)) => pb.suspend(|| println!("{line}")),
        None => println!("{line}"),
    }
}

/// Message shown next to the bar while a job runs.
pub fn progress_message(item: &InstallItem) -> String {
    let mut msg = format!("{} {}", item.action().progressive(), item.app_name());
    if item.total_write_size_mib > 0.0 {
        msg.push_str(&format!(
            " {}/{}",
            format_mib(item.written_size_mib),
            format_mib(item.total_write_size_mib)
        ));
    }
    if item.download_speed_raw_mib > 0.0 {
        msg.push_str(&format!(" ({}/s)", format_mib(item.download_speed_raw_mib)));
    }
    msg
}

/// One-line summary of a finished job.
pub fn outcome_line(item: &InstallItem) -> String {
    let name = item.app_name();
    match item.status {
        InstallStatus::Success => format!("✓ {name}: {} done", item.action()),
        InstallStatus::Cancelled => format!("- {name}: cancelled"),
        InstallStatus::Failed => format!(
            "✗ {name}: {}",
            item.failure_reason.as_deref().unwrap_or("failed")
        ),
        status => format!("{name}: {status}"),
    }
}
