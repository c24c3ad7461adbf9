//! Quiet-period coalescing for rapid edits.

use std::time::{Duration, Instant};

pub const DEFAULT_QUIET: Duration = Duration::from_millis(500);

/// Holds the most recent value until no new value has arrived for `quiet`.
///
/// Time is passed in explicitly so the owner's frame clock drives it.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Replace any pending value and restart the quiet period.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Release the pending value once the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= self.quiet);
        if ready {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any pending value. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/debounce.rs"]
mod tests;
