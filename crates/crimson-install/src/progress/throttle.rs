//! Progress event coalescing.

use std::time::{Duration, Instant};

/// Gate deciding which progress samples of one engine run become events.
///
/// The first sample always opens the gate. Samples arriving within
/// `interval` of the last delivered one are held back; only the newest held
/// sample matters, and [`take_held`](Self::take_held) lets the caller flush
/// it when the run pauses or ends.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    delivered_at: Option<Instant>,
    held: bool,
}

impl ProgressThrottle {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            delivered_at: None,
            held: false,
        }
    }

    /// Offer a fresh sample. True means emit it now.
    pub fn should_emit(&mut self) -> bool {
        let now = Instant::now();
        if self
            .delivered_at
            .is_some_and(|at| now.duration_since(at) < self.interval)
        {
            self.held = true;
            return false;
        }
        self.delivered_at = Some(now);
        self.held = false;
        true
    }

    /// Whether a sample was held back since the last delivery. Clears it.
    pub const fn take_held(&mut self) -> bool {
        let held = self.held;
        self.held = false;
        held
    }
}
