//! The meeting session aggregate.

use serde::{Deserialize, Serialize};

use crate::accrual::compute_total_cost;
use crate::ledger::SegmentLedger;
use crate::milestone::MilestoneState;
use crate::timer::TimerClock;
use crate::types::{Currency, DEFAULT_QUANTITY, DEFAULT_RATE, Language, Quantity, Rate};

/// Values used when a session starts fresh or a restored field is unusable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionDefaults {
    pub quantity: Quantity,
    pub rate: f64,
    pub currency: Currency,
    pub language: Language,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            quantity: Quantity::clamped(i64::from(DEFAULT_QUANTITY)),
            rate: DEFAULT_RATE,
            currency: Currency::default(),
            language: Language::default(),
        }
    }
}

impl SessionDefaults {
    /// Defaults with currency and language picked from a locale tag.
    pub fn for_locale(tag: &str) -> Self {
        Self {
            currency: Currency::for_locale(tag),
            language: Language::for_locale(tag),
            ..Self::default()
        }
    }
}

/// What to do with a session that was running when it was last saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumePolicy {
    /// Add the gap, stay paused, and tell the user the session was restored.
    #[default]
    PauseAndNotify,
    /// Add the gap and keep the clock running.
    AutoResume,
}

/// Everything that makes up one meeting.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub timer: TimerClock,
    pub ledger: SegmentLedger,
    pub rate: Rate,
    pub milestones: MilestoneState,
    pub language: Language,
}

impl Session {
    /// A stopped session with a single segment of `defaults.quantity`.
    pub fn new(defaults: &SessionDefaults) -> Self {
        Self {
            timer: TimerClock::new(),
            ledger: SegmentLedger::new(defaults.quantity),
            rate: Rate::new(defaults.rate, defaults.currency),
            milestones: MilestoneState::default(),
            language: defaults.language,
        }
    }

    pub const fn elapsed_secs(&self) -> u32 {
        self.timer.elapsed_secs()
    }

    pub const fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Current total cost, recomputed from the full timeline.
    pub fn total_cost(&self) -> f64 {
        compute_total_cost(
            self.ledger.segments(),
            self.timer.elapsed_secs(),
            self.rate.amount(),
        )
    }

    /// Returns the session to its initial state, keeping the current
    /// participant count, rate and language.
    pub fn reset(&mut self) {
        let seed = self.ledger.current_quantity();
        self.timer.reset();
        self.ledger.reset(seed);
        self.milestones.clear();
    }
}
