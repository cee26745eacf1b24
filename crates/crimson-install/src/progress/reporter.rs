//! Normalizes engine output into `InstallItem` metrics.

use std::collections::VecDeque;

use crimson_core::{DEFAULT_SPEED_WINDOW, InstallItem};
use tracing::trace;

use super::parser::{EngineLine, parse_line};

/// Applies engine lines to the item being processed.
///
/// One reporter lives for one engine run. It never touches the queue or
/// history; the manager decides whether a change becomes an event.
///
/// Per run:
/// - percentages are clamped to `[0, 100]` and never move backwards
/// - throughput is the mean of the last `window` raw samples
/// - the last `ERROR:` line is remembered as a failure diagnostic
#[derive(Debug)]
pub struct ProgressReporter {
    window: usize,
    samples: VecDeque<f64>,
    high_water: Option<f64>,
    last_error: Option<String>,
}

impl ProgressReporter {
    /// Create a reporter averaging throughput over `window` samples.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            high_water: None,
            last_error: None,
        }
    }

    /// Apply one raw line to `item`. Returns true if any metric changed.
    ///
    /// Malformed, partial and unrelated lines are dropped.
    pub fn apply_line(&mut self, item: &mut InstallItem, line: &str) -> bool {
        match parse_line(line) {
            Ok(parsed) => self.apply(item, parsed),
            Err(e) => {
                trace!(app_name = %item.app_name(), error = %e, "Ignoring engine line");
                false
            }
        }
    }

    /// Apply an already parsed line to `item`.
    pub fn apply(&mut self, item: &mut InstallItem, line: EngineLine) -> bool {
        match line {
            EngineLine::Progress { percentage } => self.set_percentage(item, percentage),
            EngineLine::Written { written_mib, .. } => {
                set_if_changed(&mut item.written_size_mib, written_mib.max(0.0))
            }
            EngineLine::DownloadSpeed { raw_mib_per_sec } => {
                let speed = self.push_speed(raw_mib_per_sec);
                set_if_changed(&mut item.download_speed_raw_mib, speed)
            }
            EngineLine::InstallSize { total_mib } => {
                set_if_changed(&mut item.total_write_size_mib, total_mib.max(0.0))
            }
            EngineLine::Verification {
                percentage,
                mib_per_sec,
            } => {
                let speed = self.push_speed(mib_per_sec);
                let pct_changed = self.set_percentage(item, percentage);
                let speed_changed = set_if_changed(&mut item.download_speed_raw_mib, speed);
                pct_changed || speed_changed
            }
            EngineLine::Error { message } => {
                self.last_error = Some(message);
                false
            }
        }
    }

    /// Last error line reported during this run.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Current smoothed throughput in MiB/s.
    pub fn average_speed(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.samples.len() as f64;
        self.samples.iter().sum::<f64>() / count
    }

    fn set_percentage(&mut self, item: &mut InstallItem, raw: f64) -> bool {
        let clamped = raw.clamp(0.0, 100.0);
        let next = self.high_water.map_or(clamped, |hw| hw.max(clamped));
        self.high_water = Some(next);

        if item.progress_percentage == Some(next) {
            return false;
        }
        item.progress_percentage = Some(next);
        true
    }

    fn push_speed(&mut self, sample: f64) -> f64 {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample.max(0.0));
        self.average_speed()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_WINDOW)
    }
}

fn set_if_changed(field: &mut f64, value: f64) -> bool {
    if (*field - value).abs() < f64::EPSILON {
        return false;
    }
    *field = value;
    true
}
