//! Debounced autosave bookkeeping and injectable time.
//!
//! # Responsibility
//! - Track whether unsaved changes exist and when they become due.
//! - Abstract wall-clock time so deadlines are testable without sleeping.
//!
//! # Invariants
//! - Each debounced request resets the deadline; only the latest counts.
//! - A pending write stays dirty until a write succeeds.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Monotonic clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// How soon a mutation must reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistUrgency {
    /// Structural change; write before returning to the host.
    Immediate,
    /// Content edit; write once the settle window passes quietly.
    Debounced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutosaveScheduler {
    dirty: bool,
    deadline_ms: Option<u64>,
}

impl AutosaveScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks state dirty and (re)starts the settle window.
    pub fn schedule(&mut self, now_ms: u64, window_ms: u64) {
        self.dirty = true;
        self.deadline_ms = Some(now_ms.saturating_add(window_ms));
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Whether a scheduled write has reached its deadline.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.dirty && self.deadline_ms.is_some_and(|deadline| now_ms >= deadline)
    }

    /// Records a successful write.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
        self.deadline_ms = None;
    }

    /// Records a failed write: stays dirty, deadline dropped so the retry
    /// happens on the next mutation or flush instead of every tick.
    pub fn mark_failed(&mut self) {
        self.dirty = true;
        self.deadline_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{AutosaveScheduler, Clock, ManualClock};

    #[test]
    fn rescheduling_pushes_deadline_out() {
        let clock = ManualClock::new();
        let mut scheduler = AutosaveScheduler::new();
        scheduler.schedule(clock.now_ms(), 500);
        clock.advance(400);
        scheduler.schedule(clock.now_ms(), 500);
        clock.advance(400);
        assert!(!scheduler.is_due(clock.now_ms()));
        clock.advance(100);
        assert!(scheduler.is_due(clock.now_ms()));
        scheduler.mark_saved();
        assert!(!scheduler.is_dirty());
    }

    #[test]
    fn failed_write_stays_dirty_without_deadline() {
        let mut scheduler = AutosaveScheduler::new();
        scheduler.schedule(0, 10);
        scheduler.mark_failed();
        assert!(scheduler.is_dirty());
        assert!(!scheduler.is_due(1_000));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let shared = clock.clone();
        clock.advance(250);
        assert_eq!(shared.now_ms(), 250);
    }
}
