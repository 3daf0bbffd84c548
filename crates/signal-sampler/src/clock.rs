//! Simulated-time cursor.

use std::fmt;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Cursor over the simulator's clock, tracked client-side.
///
/// Starts at midnight of the first simulated day and only moves forward. The
/// server is told about each new position through `goto-time`, which takes a
/// time of day, so formatting and elapsed-seconds both wrap every 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimClock {
    elapsed: u64,
}

impl SimClock {
    /// Cursor at the epoch (`00:00:00`).
    pub const fn new() -> Self {
        Self { elapsed: 0 }
    }

    /// Moves the cursor forward by whole seconds of `step`.
    pub fn advance(&mut self, step: Duration) {
        self.elapsed = self.elapsed.saturating_add(step.as_secs());
    }

    /// Total simulated seconds since the epoch.
    pub const fn total_seconds(&self) -> u64 {
        self.elapsed
    }

    /// Seconds since midnight of the current simulated day.
    pub const fn elapsed_seconds_of_day(&self) -> u32 {
        (self.elapsed % SECONDS_PER_DAY) as u32
    }

    /// `HH:MM:SS` of the current time of day, as `goto-time` expects it.
    pub fn format_hms(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed_seconds_of_day();
        write!(
            f,
            "{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        )
    }
}
