//! One-shot milestone notifications on the time and cost axes.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which quantity a milestone watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Elapsed seconds.
    Time,
    /// Accrued cost in currency units.
    Cost,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::Cost => write!(f, "cost"),
        }
    }
}

/// A threshold that was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Milestone {
    pub axis: Axis,
    pub value: u32,
}

/// Ordered set of threshold keys that have already fired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiredThresholds(BTreeSet<u32>);

impl FiredThresholds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a threshold. Returns `false` if it had already fired.
    pub fn insert(&mut self, value: u32) -> bool {
        self.0.insert(value)
    }

    pub fn contains(&self, value: u32) -> bool {
        self.0.contains(&value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Ascending sequence suitable for storage.
    pub fn to_vec(&self) -> Vec<u32> {
        self.0.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u32> for FiredThresholds {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Fired thresholds for both axes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MilestoneState {
    pub time: FiredThresholds,
    pub cost: FiredThresholds,
}

impl MilestoneState {
    pub fn clear(&mut self) {
        self.time.clear();
        self.cost.clear();
    }
}

/// Default time milestones in seconds: 5, 15, 30, 45, 60, 90 and 120 minutes.
pub const DEFAULT_TIME_THRESHOLDS: [u32; 7] = [300, 900, 1800, 2700, 3600, 5400, 7200];

/// Default cost milestones in currency units.
pub const DEFAULT_COST_THRESHOLDS: [u32; 7] = [50, 100, 250, 500, 1000, 2000, 5000];

/// Checks samples against configured thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneNotifier {
    time_thresholds: Vec<u32>,
    cost_thresholds: Vec<u32>,
}

impl Default for MilestoneNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_THRESHOLDS, DEFAULT_COST_THRESHOLDS)
    }
}

impl MilestoneNotifier {
    /// Creates a notifier. Thresholds are sorted and deduplicated.
    pub fn new(
        time_thresholds: impl IntoIterator<Item = u32>,
        cost_thresholds: impl IntoIterator<Item = u32>,
    ) -> Self {
        let sorted = |values: BTreeSet<u32>| values.into_iter().collect::<Vec<_>>();
        Self {
            time_thresholds: sorted(time_thresholds.into_iter().collect()),
            cost_thresholds: sorted(cost_thresholds.into_iter().collect()),
        }
    }

    pub fn time_thresholds(&self) -> &[u32] {
        &self.time_thresholds
    }

    pub fn cost_thresholds(&self) -> &[u32] {
        &self.cost_thresholds
    }

    /// Returns milestones crossed for the first time, recording them in `fired`.
    ///
    /// Time milestones come first, then cost milestones, each ascending.
    pub fn check(
        &self,
        elapsed_secs: u32,
        total_cost: f64,
        fired: &mut MilestoneState,
    ) -> Vec<Milestone> {
        let mut crossed = Vec::new();

        for &threshold in &self.time_thresholds {
            if elapsed_secs >= threshold && fired.time.insert(threshold) {
                crossed.push(Milestone {
                    axis: Axis::Time,
                    value: threshold,
                });
            }
        }

        for &threshold in &self.cost_thresholds {
            if total_cost >= f64::from(threshold) && fired.cost.insert(threshold) {
                crossed.push(Milestone {
                    axis: Axis::Cost,
                    value: threshold,
                });
            }
        }

        crossed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_fires_below_thresholds() {
        let notifier = MilestoneNotifier::default();
        let mut state = MilestoneState::default();
        assert!(notifier.check(299, 49.99, &mut state).is_empty());
        assert!(state.time.is_empty());
        assert!(state.cost.is_empty());
    }

    #[test]
    fn crossing_fires_once() {
        let notifier = MilestoneNotifier::default();
        let mut state = MilestoneState::default();

        let fired = notifier.check(300, 10.0, &mut state);
        assert_eq!(
            fired,
            vec![Milestone {
                axis: Axis::Time,
                value: 300
            }]
        );
        assert!(notifier.check(301, 10.0, &mut state).is_empty());
        assert!(state.time.contains(300));
    }

    #[test]
    fn jump_fires_all_crossed_in_order() {
        let notifier = MilestoneNotifier::default();
        let mut state = MilestoneState::default();

        let fired = notifier.check(2000, 120.0, &mut state);
        let values: Vec<(Axis, u32)> = fired.iter().map(|m| (m.axis, m.value)).collect();
        assert_eq!(
            values,
            vec![
                (Axis::Time, 300),
                (Axis::Time, 900),
                (Axis::Time, 1800),
                (Axis::Cost, 50),
                (Axis::Cost, 100),
            ]
        );
    }

    #[test]
    fn monotonic_samples_never_fire_twice() {
        let notifier = MilestoneNotifier::default();
        let mut state = MilestoneState::default();
        let mut seen = std::collections::HashSet::new();

        for elapsed in (0..10_000).step_by(7) {
            let cost = f64::from(elapsed) * 0.6;
            for milestone in notifier.check(elapsed, cost, &mut state) {
                assert!(seen.insert(milestone), "{milestone:?} fired twice");
            }
        }
        assert_eq!(seen.len(), 14);
    }

    #[test]
    fn axes_are_independent() {
        let notifier = MilestoneNotifier::new([100], [100]);
        let mut state = MilestoneState::default();
        state.time.insert(100);

        let fired = notifier.check(500, 500.0, &mut state);
        assert_eq!(
            fired,
            vec![Milestone {
                axis: Axis::Cost,
                value: 100
            }]
        );
    }

    #[test]
    fn clear_allows_refiring() {
        let notifier = MilestoneNotifier::default();
        let mut state = MilestoneState::default();
        notifier.check(400, 0.0, &mut state);
        state.clear();
        assert_eq!(notifier.check(400, 0.0, &mut state).len(), 1);
    }

    #[test]
    fn thresholds_are_sorted_and_deduplicated() {
        let notifier = MilestoneNotifier::new([60, 10, 60], [5, 1]);
        assert_eq!(notifier.time_thresholds(), &[10, 60]);
        assert_eq!(notifier.cost_thresholds(), &[1, 5]);
    }

    #[test]
    fn fired_thresholds_serialize_as_sequence() {
        let fired: FiredThresholds = [900, 300].into_iter().collect();
        assert_eq!(serde_json::to_string(&fired).unwrap(), "[300,900]");
        assert_eq!(fired.to_vec(), vec![300, 900]);
    }
}
