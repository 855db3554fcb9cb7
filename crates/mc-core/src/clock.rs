//! Wall-clock sources.
//!
//! The engine never reads the system time directly; it asks a [`Clock`].
//! This keeps reconciliation and share-link decoding deterministic in tests.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{Local, Utc};

/// Source of the current wall-clock time.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// Local timezone offset in minutes, using the browser convention:
    /// UTC minus local time (positive west of Greenwich, so UTC+2 is `-120`).
    fn timezone_offset_minutes(&self) -> i32;
}

/// The host system's clock and timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn timezone_offset_minutes(&self) -> i32 {
        -Local::now().offset().local_minus_utc() / 60
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// hand another to the engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Rc<Cell<i64>>,
    offset_minutes: Rc<Cell<i32>>,
}

impl ManualClock {
    /// Creates a clock fixed at `now_ms` in UTC.
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: Rc::new(Cell::new(now_ms)),
            offset_minutes: Rc::new(Cell::new(0)),
        }
    }

    /// Sets the timezone offset reported by this clock.
    #[must_use]
    pub fn with_offset_minutes(self, minutes: i32) -> Self {
        self.offset_minutes.set(minutes);
        self
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.set(now_ms);
    }

    pub fn advance_ms(&self, delta: i64) {
        self.now_ms.set(self.now_ms.get() + delta);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1000);
    }

    pub fn set_offset_minutes(&self, minutes: i32) {
        self.offset_minutes.set(minutes);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }

    fn timezone_offset_minutes(&self) -> i32 {
        self.offset_minutes.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }

    fn timezone_offset_minutes(&self) -> i32 {
        (**self).timezone_offset_minutes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();
        handle.advance_secs(5);
        assert_eq!(clock.now_ms(), 6_000);
    }

    #[test]
    fn manual_clock_reports_offset() {
        let clock = ManualClock::new(0).with_offset_minutes(-60);
        assert_eq!(clock.timezone_offset_minutes(), -60);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
