//! Wall-clock anchored meeting timer.
//!
//! Elapsed time is never counted tick by tick. While running, the timer keeps
//! an anchor (the wall-clock instant the meeting would have started if it had
//! never been paused) and derives elapsed seconds as `floor((now - anchor) / 1000)`.
//! Missed ticks, a suspended process, or a reload therefore cost nothing in
//! accuracy.

use serde::{Deserialize, Serialize};

use crate::types::{MAX_ELAPSED_SECS, clamp_elapsed};

/// Coarse lifecycle of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    /// Never started, or reset.
    Stopped,
    Running,
    /// Holds a frozen, non-zero elapsed time.
    Paused,
}

/// Result of a single [`TimerClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub elapsed_secs: u32,
    /// The 24 hour cap was reached and the timer paused itself.
    pub capped: bool,
}

/// Result of reconciling a persisted running timer after a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub elapsed_secs: u32,
    /// Whole seconds that passed while nobody was watching.
    pub gap_secs: u32,
}

/// Elapsed-time tracker anchored to the wall clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerClock {
    elapsed_secs: u32,
    anchor_ms: Option<i64>,
}

impl TimerClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A paused timer holding `elapsed_secs` (clamped to the cap).
    pub fn paused_at(elapsed_secs: u32) -> Self {
        Self {
            elapsed_secs: elapsed_secs.min(MAX_ELAPSED_SECS),
            anchor_ms: None,
        }
    }

    pub const fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub const fn is_running(&self) -> bool {
        self.anchor_ms.is_some()
    }

    /// Wall-clock anchor; only present while running.
    pub const fn anchor_ms(&self) -> Option<i64> {
        self.anchor_ms
    }

    pub const fn status(&self) -> TimerStatus {
        match (self.anchor_ms, self.elapsed_secs) {
            (Some(_), _) => TimerStatus::Running,
            (None, 0) => TimerStatus::Stopped,
            (None, _) => TimerStatus::Paused,
        }
    }

    /// The anchor a running timer would have right now.
    ///
    /// Equal to the real anchor while running; otherwise back-computed from
    /// the frozen elapsed time.
    pub fn effective_anchor_ms(&self, now_ms: i64) -> i64 {
        self.anchor_ms
            .unwrap_or_else(|| now_ms - i64::from(self.elapsed_secs) * 1000)
    }

    /// Starts the timer. Returns `false` if it was already running or the
    /// elapsed time has already hit the cap.
    pub fn start(&mut self, now_ms: i64) -> bool {
        if self.is_running() || self.elapsed_secs >= MAX_ELAPSED_SECS {
            return false;
        }
        self.anchor_ms = Some(now_ms - i64::from(self.elapsed_secs) * 1000);
        true
    }

    /// Resumes from an externally supplied anchor (a share link).
    pub fn resume_from_anchor(&mut self, anchor_ms: i64, now_ms: i64) {
        self.anchor_ms = Some(anchor_ms);
        self.sync(now_ms);
    }

    /// Freezes elapsed time at its current value. Returns `false` if the
    /// timer was not running.
    pub fn pause(&mut self, now_ms: i64) -> bool {
        if !self.is_running() {
            return false;
        }
        self.sync(now_ms);
        self.anchor_ms = None;
        true
    }

    /// Stops the timer and zeroes elapsed time.
    pub fn reset(&mut self) {
        self.anchor_ms = None;
        self.elapsed_secs = 0;
    }

    /// Recomputes elapsed time from the anchor.
    ///
    /// Does nothing while paused. Reaching the cap clamps the elapsed time and
    /// forces a pause.
    pub fn tick(&mut self, now_ms: i64) -> TickOutcome {
        let capped = self.sync(now_ms);
        if capped {
            tracing::debug!(elapsed = self.elapsed_secs, "elapsed cap reached, pausing");
            self.anchor_ms = None;
        }
        TickOutcome {
            elapsed_secs: self.elapsed_secs,
            capped,
        }
    }

    /// Rebuilds timer state from a persisted snapshot.
    ///
    /// A snapshot that was running when saved has the wall-clock gap since the
    /// save added to its elapsed time. The timer always comes back paused; the
    /// caller decides whether to restart it.
    pub fn reconcile_after_suspend(
        &mut self,
        now_ms: i64,
        last_persisted_ms: i64,
        was_running: bool,
        persisted_elapsed: u32,
    ) -> Reconciled {
        let gap_secs = if was_running {
            // A clock that went backwards contributes nothing.
            clamp_elapsed(now_ms.saturating_sub(last_persisted_ms).max(0).div_euclid(1000))
        } else {
            0
        };
        self.anchor_ms = None;
        self.elapsed_secs = clamp_elapsed(i64::from(persisted_elapsed) + i64::from(gap_secs));
        Reconciled {
            elapsed_secs: self.elapsed_secs,
            gap_secs,
        }
    }

    /// Returns true if the cap was hit.
    fn sync(&mut self, now_ms: i64) -> bool {
        let Some(anchor) = self.anchor_ms else {
            return false;
        };
        let raw = now_ms.saturating_sub(anchor).div_euclid(1000);
        self.elapsed_secs = clamp_elapsed(raw);
        raw >= i64::from(MAX_ELAPSED_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn new_timer_is_stopped() {
        let timer = TimerClock::new();
        assert_eq!(timer.status(), TimerStatus::Stopped);
        assert_eq!(timer.elapsed_secs(), 0);
        assert!(timer.anchor_ms().is_none());
    }

    #[test]
    fn start_sets_anchor_from_elapsed() {
        let mut timer = TimerClock::paused_at(30);
        assert!(timer.start(T0));
        assert_eq!(timer.anchor_ms(), Some(T0 - 30_000));
        assert!(!timer.start(T0 + 5_000), "second start is a no-op");
        assert_eq!(timer.anchor_ms(), Some(T0 - 30_000));
    }

    #[test]
    fn tick_floors_partial_seconds() {
        let mut timer = TimerClock::new();
        timer.start(T0);
        let outcome = timer.tick(T0 + 1_999);
        assert_eq!(outcome.elapsed_secs, 1);
        assert!(!outcome.capped);
    }

    #[test]
    fn pause_freezes_elapsed() {
        let mut timer = TimerClock::new();
        timer.start(T0);
        assert!(timer.pause(T0 + 10_500));
        assert_eq!(timer.elapsed_secs(), 10);
        assert_eq!(timer.status(), TimerStatus::Paused);

        // Ticks while paused change nothing
        timer.tick(T0 + 60_000);
        assert_eq!(timer.elapsed_secs(), 10);
        assert!(!timer.pause(T0 + 70_000));
    }

    #[test]
    fn resume_continues_from_frozen_time() {
        let mut timer = TimerClock::new();
        timer.start(T0);
        timer.pause(T0 + 10_000);
        timer.start(T0 + 100_000);
        timer.tick(T0 + 105_000);
        assert_eq!(timer.elapsed_secs(), 15);
    }

    #[test]
    fn tick_caps_and_pauses() {
        let mut timer = TimerClock::new();
        timer.start(T0);
        let outcome = timer.tick(T0 + 90_000_000);
        assert!(outcome.capped);
        assert_eq!(outcome.elapsed_secs, MAX_ELAPSED_SECS);
        assert!(!timer.is_running());
        assert!(!timer.start(T0 + 90_000_001), "capped timer cannot restart");
    }

    #[test]
    fn reset_returns_to_stopped() {
        let mut timer = TimerClock::new();
        timer.start(T0);
        timer.tick(T0 + 5_000);
        timer.reset();
        assert_eq!(timer.status(), TimerStatus::Stopped);
        assert_eq!(timer.elapsed_secs(), 0);
    }

    #[test]
    fn reconcile_adds_gap_and_stays_paused() {
        let mut timer = TimerClock::new();
        let result = timer.reconcile_after_suspend(T0, T0 - 120_000, true, 300);
        assert_eq!(result.elapsed_secs, 420);
        assert_eq!(result.gap_secs, 120);
        assert!(!timer.is_running());
    }

    #[test]
    fn reconcile_ignores_gap_when_not_running() {
        let mut timer = TimerClock::new();
        let result = timer.reconcile_after_suspend(T0, T0 - 120_000, false, 300);
        assert_eq!(result.elapsed_secs, 300);
        assert_eq!(result.gap_secs, 0);
    }

    #[test]
    fn reconcile_clamps_to_cap_and_ignores_backwards_clock() {
        let mut timer = TimerClock::new();
        let result = timer.reconcile_after_suspend(T0, T0 - 200_000_000, true, 300);
        assert_eq!(result.elapsed_secs, MAX_ELAPSED_SECS);

        let result = timer.reconcile_after_suspend(T0, T0 + 50_000, true, 300);
        assert_eq!(result.elapsed_secs, 300);
    }

    #[test]
    fn reconcile_saturates_extreme_timestamps() {
        let mut timer = TimerClock::new();
        let result = timer.reconcile_after_suspend(T0, i64::MIN, true, 300);
        assert_eq!(result.elapsed_secs, MAX_ELAPSED_SECS);

        let result = timer.reconcile_after_suspend(i64::MIN, i64::MAX, true, 300);
        assert_eq!(result.elapsed_secs, 300);
    }

    #[test]
    fn effective_anchor_back_computes_when_paused() {
        let timer = TimerClock::paused_at(60);
        assert_eq!(timer.effective_anchor_ms(T0), T0 - 60_000);
    }
}
