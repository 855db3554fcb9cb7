//! Cost accrual over a segmented participant timeline.
//!
//! # Algorithm
//!
//! 1. Read each segment's start time and quantity; drop entries missing either
//! 2. Each segment lasts until the next one starts; the last lasts until `elapsed`
//! 3. Cost of a segment is `rate * quantity * duration / 3600`
//!
//! The total is recomputed from scratch on every refresh rather than
//! accumulated, so rounding never drifts.

use crate::ledger::Segment;

/// A segment suitable for cost accrual.
///
/// This trait allows accrual to run over the typed [`Segment`] as well as
/// partially decoded records whose fields may be missing or mistyped.
pub trait CostSegment {
    /// Seconds into the meeting at which the segment starts, if readable.
    fn start_secs(&self) -> Option<u32>;

    /// Participant count, if readable.
    fn quantity(&self) -> Option<u32>;
}

impl CostSegment for Segment {
    fn start_secs(&self) -> Option<u32> {
        Some(self.start_time)
    }

    fn quantity(&self) -> Option<u32> {
        Some(self.quantity.value())
    }
}

/// Cost contributed by one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentCost {
    pub start_secs: u32,
    pub duration_secs: u32,
    pub quantity: u32,
    pub cost: f64,
}

/// Per-segment cost breakdown.
///
/// Malformed entries are skipped before durations are computed, so a valid
/// segment runs until the next valid start rather than the next raw entry.
/// Segments whose computed duration would be
/// negative (out of order, or starting after `elapsed_secs`) contribute
/// nothing and are omitted.
pub fn segment_costs<S: CostSegment>(
    segments: &[S],
    elapsed_secs: u32,
    rate_per_hour: f64,
) -> Vec<SegmentCost> {
    let rate = if rate_per_hour.is_finite() {
        rate_per_hour
    } else {
        0.0
    };

    let valid: Vec<(u32, u32)> = segments
        .iter()
        .filter_map(|s| match (s.start_secs(), s.quantity()) {
            (Some(start), Some(quantity)) => Some((start, quantity)),
            _ => {
                tracing::warn!("skipping malformed segment during cost accrual");
                None
            }
        })
        .collect();

    let mut costs = Vec::with_capacity(valid.len());
    for (i, &(start, quantity)) in valid.iter().enumerate() {
        let end = valid.get(i + 1).map_or(elapsed_secs, |&(next, _)| next);
        let Some(duration_secs) = end.checked_sub(start) else {
            continue;
        };
        let cost = rate * f64::from(quantity) * f64::from(duration_secs) / 3600.0;
        costs.push(SegmentCost {
            start_secs: start,
            duration_secs,
            quantity,
            cost,
        });
    }
    costs
}

/// Total meeting cost for `elapsed_secs` at `rate_per_hour` per participant.
///
/// Pure and deterministic; never negative.
pub fn compute_total_cost<S: CostSegment>(
    segments: &[S],
    elapsed_secs: u32,
    rate_per_hour: f64,
) -> f64 {
    let total: f64 = segment_costs(segments, elapsed_secs, rate_per_hour)
        .iter()
        .map(|c| c.cost)
        .sum();
    total.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quantity;

    fn seg(start: u32, quantity: i64) -> Segment {
        Segment::new(start, Quantity::clamped(quantity))
    }

    /// A segment whose fields may be unreadable.
    struct RawSegment {
        start: Option<u32>,
        quantity: Option<u32>,
    }

    impl CostSegment for RawSegment {
        fn start_secs(&self) -> Option<u32> {
            self.start
        }

        fn quantity(&self) -> Option<u32> {
            self.quantity
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_half_hour_two_people() {
        let cost = compute_total_cost(&[seg(0, 2)], 1800, 65.0);
        assert_close(cost, 65.0);
    }

    #[test]
    fn test_quantity_change_mid_meeting() {
        let cost = compute_total_cost(&[seg(0, 2), seg(1800, 4)], 3600, 65.0);
        assert_close(cost, 195.0);
    }

    #[test]
    fn test_single_segment_formula() {
        for elapsed in [0, 1, 59, 3600, 86_400] {
            let cost = compute_total_cost(&[seg(0, 7)], elapsed, 120.0);
            assert_close(cost, 120.0 * 7.0 * f64::from(elapsed) / 3600.0);
        }
    }

    #[test]
    fn test_cost_is_monotonic_in_elapsed() {
        let segments = [seg(0, 3), seg(600, 1), seg(1200, 12)];
        let mut previous = 0.0;
        for elapsed in (1200..5000).step_by(37) {
            let cost = compute_total_cost(&segments, elapsed, 80.0);
            assert!(cost >= previous);
            previous = cost;
        }
    }

    #[test]
    fn test_additivity_across_segments() {
        let segments = [seg(0, 2), seg(300, 5), seg(900, 3), seg(2000, 8)];
        let total = compute_total_cost(&segments, 2600, 65.0);
        let independent = compute_total_cost(&[seg(0, 2)], 300, 65.0)
            + compute_total_cost(&[seg(0, 5)], 600, 65.0)
            + compute_total_cost(&[seg(0, 3)], 1100, 65.0)
            + compute_total_cost(&[seg(0, 8)], 600, 65.0);
        assert_close(total, independent);

        let breakdown: f64 = segment_costs(&segments, 2600, 65.0)
            .iter()
            .map(|c| c.cost)
            .sum();
        assert_close(total, breakdown);
    }

    #[test]
    fn test_malformed_segments_are_skipped() {
        let segments = [
            RawSegment {
                start: Some(0),
                quantity: Some(2),
            },
            RawSegment {
                start: None,
                quantity: Some(50),
            },
            RawSegment {
                start: Some(1800),
                quantity: None,
            },
        ];
        let cost = compute_total_cost(&segments, 3600, 65.0);
        assert_close(cost, 130.0);
    }

    #[test]
    fn test_segment_after_elapsed_contributes_nothing() {
        let cost = compute_total_cost(&[seg(0, 2), seg(4000, 10)], 3600, 65.0);
        assert_close(cost, 65.0 * 2.0 * (4000.0 / 3600.0));
        let breakdown = segment_costs(&[seg(0, 2), seg(4000, 10)], 3600, 65.0);
        assert_eq!(breakdown.len(), 1);
    }

    #[test]
    fn test_non_finite_rate_costs_nothing() {
        assert_close(compute_total_cost(&[seg(0, 2)], 600, f64::NAN), 0.0);
        assert_close(compute_total_cost(&[seg(0, 2)], 600, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_empty_segments() {
        let segments: [Segment; 0] = [];
        assert_close(compute_total_cost(&segments, 600, 65.0), 0.0);
    }
}
