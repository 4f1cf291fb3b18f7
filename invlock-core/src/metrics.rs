//! Runtime counters for the lock engine.
//!
//! Counters are plain `AtomicU64`s bumped on the hot path and read through
//! [`LockCounters::snapshot`] for diagnostics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for engine activity.
#[derive(Debug, Default)]
pub struct LockCounters {
    /// Contributions inserted (duplicates not counted).
    pub contributions_added: AtomicU64,
    /// Contributions removed.
    pub contributions_removed: AtomicU64,
    /// Compartment flag writes sent to the applier.
    pub flag_writes: AtomicU64,
    /// Refresh requests sent to the applier.
    pub refreshes: AtomicU64,
    /// Events skipped because the user holds bypass.
    pub bypass_skips: AtomicU64,
    /// Zone events for zones with no configured rule.
    pub unknown_zone_events: AtomicU64,
    /// Manual overrides accepted.
    pub manual_overrides: AtomicU64,
    /// Session records created.
    pub sessions_opened: AtomicU64,
    /// Session records destroyed.
    pub sessions_closed: AtomicU64,
}

impl LockCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            contributions_added: AtomicU64::new(0),
            contributions_removed: AtomicU64::new(0),
            flag_writes: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            bypass_skips: AtomicU64::new(0),
            unknown_zone_events: AtomicU64::new(0),
            manual_overrides: AtomicU64::new(0),
            sessions_opened: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
        }
    }

    /// Add `n` to a counter.
    pub fn add(counter: &AtomicU64, n: u64) {
        if n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Increment a counter by one.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            contributions_added: self.contributions_added.load(Ordering::Relaxed),
            contributions_removed: self.contributions_removed.load(Ordering::Relaxed),
            flag_writes: self.flag_writes.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            bypass_skips: self.bypass_skips.load(Ordering::Relaxed),
            unknown_zone_events: self.unknown_zone_events.load(Ordering::Relaxed),
            manual_overrides: self.manual_overrides.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value copy of [`LockCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Contributions inserted.
    pub contributions_added: u64,
    /// Contributions removed.
    pub contributions_removed: u64,
    /// Compartment flag writes.
    pub flag_writes: u64,
    /// Refresh requests.
    pub refreshes: u64,
    /// Bypass skips.
    pub bypass_skips: u64,
    /// Unknown-zone events.
    pub unknown_zone_events: u64,
    /// Manual overrides.
    pub manual_overrides: u64,
    /// Sessions created.
    pub sessions_opened: u64,
    /// Sessions destroyed.
    pub sessions_closed: u64,
}

/// Span names used with `tracing::span!`.
pub mod spans {
    /// One reconciliation pass for one user.
    pub const RECONCILE: &str = "invlock::reconcile";
    /// Forced unlock of every session.
    pub const SHUTDOWN: &str = "invlock::shutdown";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_default_zero() {
        let c = LockCounters::new();
        assert_eq!(c.snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn counters_increment_and_snapshot() {
        let c = LockCounters::new();
        LockCounters::bump(&c.refreshes);
        LockCounters::add(&c.flag_writes, 3);
        LockCounters::add(&c.flag_writes, 0);
        let snap = c.snapshot();
        assert_eq!(snap.refreshes, 1);
        assert_eq!(snap.flag_writes, 3);
        assert_eq!(snap.bypass_skips, 0);
    }
}
