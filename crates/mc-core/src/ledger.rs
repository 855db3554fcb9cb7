//! Participant timeline.
//!
//! The ledger is an ordered list of segments, each recording how many people
//! were in the meeting from its start time until the next segment starts.

use serde::{Deserialize, Serialize};

use crate::types::Quantity;

/// A stretch of the meeting with a constant participant count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Seconds into the meeting at which this segment begins.
    pub start_time: u32,
    pub quantity: Quantity,
}

impl Segment {
    pub const fn new(start_time: u32, quantity: Quantity) -> Self {
        Self {
            start_time,
            quantity,
        }
    }
}

/// What [`SegmentLedger::add_or_update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    /// The requested quantity already applies.
    Unchanged,
    /// A new segment was opened at the current elapsed time.
    Appended { from: Quantity, to: Quantity },
    /// The open segment was edited while paused.
    Updated { from: Quantity, to: Quantity },
    /// A change arrived at or before the open segment's start and replaced
    /// its quantity instead of opening a zero-length segment.
    Coalesced { from: Quantity, to: Quantity },
}

impl LedgerChange {
    /// Signed change in participants, zero for [`LedgerChange::Unchanged`].
    pub fn delta(&self) -> i64 {
        match *self {
            Self::Unchanged => 0,
            Self::Appended { from, to }
            | Self::Updated { from, to }
            | Self::Coalesced { from, to } => i64::from(to.value()) - i64::from(from.value()),
        }
    }
}

/// Ordered, never-empty timeline of segments.
///
/// Invariants: start times strictly increase, the first segment starts at 0,
/// and there is always at least one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLedger {
    segments: Vec<Segment>,
}

impl SegmentLedger {
    /// A ledger with a single seed segment at time 0.
    pub fn new(seed: Quantity) -> Self {
        Self {
            segments: vec![Segment::new(0, seed)],
        }
    }

    /// Rebuilds a ledger from untrusted data.
    ///
    /// The first segment is moved to time 0, segments whose start does not
    /// strictly increase are folded into their predecessor, and an empty input
    /// yields a single `seed` segment.
    pub fn from_segments<I>(segments: I, seed: Quantity) -> Self
    where
        I: IntoIterator<Item = Segment>,
    {
        let mut out: Vec<Segment> = Vec::new();
        for segment in segments {
            match out.last_mut() {
                None => out.push(Segment::new(0, segment.quantity)),
                Some(last) if segment.start_time <= last.start_time => {
                    last.quantity = segment.quantity;
                }
                Some(_) => out.push(segment),
            }
        }
        if out.is_empty() {
            return Self::new(seed);
        }
        Self { segments: out }
    }

    /// Read-only ordered view.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The open (last) segment.
    pub fn current(&self) -> Segment {
        // The constructor guarantees at least one segment.
        self.segments
            .last()
            .copied()
            .unwrap_or_else(|| Segment::new(0, Quantity::default()))
    }

    pub fn current_quantity(&self) -> Quantity {
        self.current().quantity
    }

    /// Records a participant count.
    ///
    /// While running a change opens a new segment at `elapsed_secs`; while
    /// paused no time has accrued under the open segment yet, so it is edited
    /// in place.
    pub fn add_or_update(&mut self, quantity: i64, elapsed_secs: u32, running: bool) -> LedgerChange {
        let to = Quantity::clamped(quantity);
        let last_index = self.segments.len() - 1;
        let last = &mut self.segments[last_index];
        let from = last.quantity;

        if to == from {
            return LedgerChange::Unchanged;
        }

        if !running {
            last.quantity = to;
            return LedgerChange::Updated { from, to };
        }

        if elapsed_secs <= last.start_time {
            last.quantity = to;
            return LedgerChange::Coalesced { from, to };
        }

        self.segments.push(Segment::new(elapsed_secs, to));
        LedgerChange::Appended { from, to }
    }

    /// Drops segments that start after `elapsed_secs`.
    ///
    /// Returns how many segments were removed. The first segment is always
    /// kept.
    pub fn truncate_after(&mut self, elapsed_secs: u32) -> usize {
        let keep = self
            .segments
            .iter()
            .skip(1)
            .take_while(|s| s.start_time <= elapsed_secs)
            .count()
            + 1;
        let removed = self.segments.len() - keep;
        self.segments.truncate(keep);
        removed
    }

    /// Replaces the timeline with a single `seed` segment at time 0.
    pub fn reset(&mut self, seed: Quantity) {
        self.segments.clear();
        self.segments.push(Segment::new(0, seed));
    }
}

impl Default for SegmentLedger {
    fn default() -> Self {
        Self::new(Quantity::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: i64) -> Quantity {
        Quantity::clamped(n)
    }

    fn starts(ledger: &SegmentLedger) -> Vec<(u32, u32)> {
        ledger
            .segments()
            .iter()
            .map(|s| (s.start_time, s.quantity.value()))
            .collect()
    }

    #[test]
    fn new_ledger_has_seed_segment() {
        let ledger = SegmentLedger::new(q(3));
        assert_eq!(starts(&ledger), vec![(0, 3)]);
        assert!(!ledger.is_empty());
    }

    #[test]
    fn same_quantity_is_noop() {
        let mut ledger = SegmentLedger::new(q(2));
        assert_eq!(ledger.add_or_update(2, 100, true), LedgerChange::Unchanged);
        assert_eq!(ledger.add_or_update(2, 100, false), LedgerChange::Unchanged);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn running_change_appends() {
        let mut ledger = SegmentLedger::new(q(2));
        let change = ledger.add_or_update(4, 1800, true);
        assert_eq!(change, LedgerChange::Appended { from: q(2), to: q(4) });
        assert_eq!(change.delta(), 2);
        assert_eq!(starts(&ledger), vec![(0, 2), (1800, 4)]);
    }

    #[test]
    fn paused_change_updates_in_place() {
        let mut ledger = SegmentLedger::new(q(2));
        ledger.add_or_update(4, 1800, true);
        let change = ledger.add_or_update(3, 2000, false);
        assert_eq!(change, LedgerChange::Updated { from: q(4), to: q(3) });
        assert_eq!(starts(&ledger), vec![(0, 2), (1800, 3)]);
    }

    #[test]
    fn running_change_at_same_second_coalesces() {
        let mut ledger = SegmentLedger::new(q(2));
        ledger.add_or_update(4, 60, true);
        let change = ledger.add_or_update(5, 60, true);
        assert_eq!(change, LedgerChange::Coalesced { from: q(4), to: q(5) });
        assert_eq!(starts(&ledger), vec![(0, 2), (60, 5)]);

        let change = ledger.add_or_update(1, 30, true);
        assert!(matches!(change, LedgerChange::Coalesced { .. }));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn quantity_is_clamped() {
        let mut ledger = SegmentLedger::new(q(2));
        ledger.add_or_update(5000, 10, true);
        assert_eq!(ledger.current_quantity().value(), 999);
        ledger.add_or_update(-3, 20, true);
        assert_eq!(ledger.current_quantity().value(), 1);
    }

    #[test]
    fn from_segments_normalizes_input() {
        let ledger = SegmentLedger::from_segments(
            [
                Segment::new(5, q(2)),
                Segment::new(100, q(3)),
                Segment::new(100, q(4)),
                Segment::new(50, q(6)),
                Segment::new(200, q(7)),
            ],
            q(2),
        );
        assert_eq!(starts(&ledger), vec![(0, 2), (100, 6), (200, 7)]);
    }

    #[test]
    fn from_segments_empty_uses_seed() {
        let ledger = SegmentLedger::from_segments(Vec::new(), q(9));
        assert_eq!(starts(&ledger), vec![(0, 9)]);
    }

    #[test]
    fn truncate_after_keeps_first_segment() {
        let mut ledger = SegmentLedger::from_segments(
            [Segment::new(0, q(2)), Segment::new(100, q(3)), Segment::new(200, q(4))],
            q(2),
        );
        assert_eq!(ledger.truncate_after(150), 1);
        assert_eq!(starts(&ledger), vec![(0, 2), (100, 3)]);
        assert_eq!(ledger.truncate_after(0), 1);
        assert_eq!(starts(&ledger), vec![(0, 2)]);
    }

    #[test]
    fn reset_replaces_timeline() {
        let mut ledger = SegmentLedger::new(q(2));
        ledger.add_or_update(4, 10, true);
        ledger.add_or_update(6, 20, true);
        ledger.reset(q(6));
        assert_eq!(starts(&ledger), vec![(0, 6)]);
    }

    #[test]
    fn segment_serializes_camel_case() {
        let json = serde_json::to_string(&Segment::new(30, q(4))).unwrap();
        assert_eq!(json, r#"{"startTime":30,"quantity":4}"#);
    }
}
