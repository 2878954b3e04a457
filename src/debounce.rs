//! Replace-the-handle debounce timers.
//!
//! The engine is single-threaded and cooperative: bursts of pan, scroll,
//! and resize events must collapse into one recomputation after a quiet
//! period. A [`Debounce`] holds at most one pending deadline; scheduling
//! replaces whatever was pending, so the last scheduled recomputation
//! wins and a superseded one never runs. The engine never reads the
//! clock itself: callers pass `now` in, and due deadlines fire from the
//! host-driven tick.

use std::time::Instant;

/// At most one pending deadline, replaced on every schedule.
#[derive(Debug, Default)]
pub struct Debounce {
    deadline: Option<Instant>,
}

impl Debounce {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel-and-restart: any previously pending deadline is discarded.
    pub fn schedule(&mut self, at: Instant) {
        self.deadline = Some(at);
    }

    /// Explicit, total cancellation.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if any; hosts use it to size poll timeouts.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed. Fires at most once per
    /// schedule.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if now >= at => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
