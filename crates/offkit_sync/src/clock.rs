//! Time sources and request id generation.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of millisecond timestamps.
pub trait Clock: Send + Sync {
    /// Returns milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `now`.
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Issues request ids from a clock.
///
/// Ids are the decimal timestamp of creation. Within one generator ids are
/// strictly increasing: if the clock has not moved past the last id, the
/// last id plus one is issued instead. Ids issued elsewhere (for example
/// by an earlier process over the same store) are fed in with
/// [`observe`](Self::observe).
pub struct RequestIdGenerator {
    clock: Arc<dyn Clock>,
    last: Mutex<u64>,
}

impl RequestIdGenerator {
    /// Creates a generator reading `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: Mutex::new(0),
        }
    }

    /// Returns the next id.
    pub fn next_id(&self) -> String {
        let now = self.clock.now_millis();
        let mut last = self.last.lock();
        *last = if now > *last { now } else { *last + 1 };
        last.to_string()
    }

    /// Records `id` as issued, so later ids are greater than it.
    pub fn observe(&self, id: u64) {
        let mut last = self.last.lock();
        *last = (*last).max(id);
    }
}

impl std::fmt::Debug for RequestIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestIdGenerator")
            .field("last", &*self.last.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_the_clock() {
        let clock = Arc::new(ManualClock::new(100));
        let ids = RequestIdGenerator::new(clock.clone());
        assert_eq!(ids.next_id(), "100");
        clock.advance(50);
        assert_eq!(ids.next_id(), "150");
    }

    #[test]
    fn ids_never_repeat() {
        let clock = Arc::new(ManualClock::new(100));
        let ids = RequestIdGenerator::new(clock.clone());
        assert_eq!(ids.next_id(), "100");
        assert_eq!(ids.next_id(), "101");
        clock.set(90);
        assert_eq!(ids.next_id(), "102");
    }

    #[test]
    fn observed_ids_are_skipped() {
        let clock = Arc::new(ManualClock::new(100));
        let ids = RequestIdGenerator::new(clock.clone());
        ids.observe(102);
        assert_eq!(ids.next_id(), "103");
        ids.observe(50);
        clock.set(200);
        assert_eq!(ids.next_id(), "200");
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
