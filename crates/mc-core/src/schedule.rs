//! Deadline bookkeeping for the refresh tick and the debounced save.
//!
//! Nothing here sleeps or spawns. Hosts read the deadlines and call back
//! into the engine when they pass; tests drive them with a manual clock.

/// A single pending write that coalesces repeated requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingWrite {
    due_at_ms: Option<i64>,
}

impl PendingWrite {
    pub const fn new() -> Self {
        Self { due_at_ms: None }
    }

    /// Schedules a write `delay_ms` from `now_ms` unless one is already
    /// pending. Returns `true` if a new write was scheduled.
    pub fn request(&mut self, now_ms: i64, delay_ms: u64) -> bool {
        if self.due_at_ms.is_some() {
            return false;
        }
        let delay = i64::try_from(delay_ms).unwrap_or(i64::MAX);
        self.due_at_ms = Some(now_ms.saturating_add(delay));
        true
    }

    pub const fn cancel(&mut self) {
        self.due_at_ms = None;
    }

    pub const fn is_pending(&self) -> bool {
        self.due_at_ms.is_some()
    }

    pub const fn due_at_ms(&self) -> Option<i64> {
        self.due_at_ms
    }

    pub fn is_due(&self, now_ms: i64) -> bool {
        self.due_at_ms.is_some_and(|due| now_ms >= due)
    }
}

/// The periodic refresh schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    interval_ms: u64,
    next_due_ms: Option<i64>,
}

impl TickSchedule {
    /// A cancelled schedule with the given period (at least 1 ms).
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            next_due_ms: None,
        }
    }

    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Arms the schedule so the next tick is due one period after `now_ms`.
    pub fn schedule(&mut self, now_ms: i64) {
        let interval = i64::try_from(self.interval_ms).unwrap_or(i64::MAX);
        self.next_due_ms = Some(now_ms.saturating_add(interval));
    }

    pub const fn cancel(&mut self) {
        self.next_due_ms = None;
    }

    pub const fn is_scheduled(&self) -> bool {
        self.next_due_ms.is_some()
    }

    pub const fn next_due_ms(&self) -> Option<i64> {
        self.next_due_ms
    }

    /// Milliseconds until the next tick, zero if overdue, `None` if cancelled.
    pub fn due_in(&self, now_ms: i64) -> Option<u64> {
        self.next_due_ms
            .map(|due| u64::try_from(due.saturating_sub(now_ms)).unwrap_or(0))
    }
}
