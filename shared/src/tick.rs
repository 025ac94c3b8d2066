//! Periodic work polled from a single-threaded cycle.
//!
//! A [`Ticker`] never runs anything by itself. Its owner calls
//! [`Ticker::poll`] once per cycle and does the timed work when it returns
//! true. Cancelling is therefore synchronous: once [`Ticker::cancel`]
//! returns, no later poll can fire until the ticker is started again.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Ticker {
    /// Creates a stopped ticker.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// Schedules the first tick for `now`, so the next poll fires.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns true at most once per call when a tick is due.
    ///
    /// Missed ticks are skipped rather than replayed: after a long stall the
    /// next tick is scheduled one interval from `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }

        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_due = Some(next);
        true
    }
}
