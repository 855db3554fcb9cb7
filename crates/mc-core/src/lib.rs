//! Core engine for the meeting cost calculator.
//!
//! This crate contains the fundamental types and logic for:
//! - Timing: a wall-clock anchored timer that survives suspension
//! - Accrual: cost over a piecewise timeline of participant counts
//! - Milestones: one-shot time and cost notifications
//! - Codecs: the local storage record and timezone-corrected share links
//!
//! [`Engine`] owns one session and drives the pieces in tick order. It talks
//! to the outside world only through the [`Clock`] and [`KeyValueStore`]
//! traits.

pub mod accrual;
pub mod clock;
pub mod codec;
pub mod engine;
pub mod format;
pub mod ledger;
pub mod milestone;
pub mod schedule;
pub mod session;
pub mod store;
pub mod timer;
pub mod types;

pub use accrual::{CostSegment, SegmentCost, compute_total_cost, segment_costs};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{
    RestoreSource, Restored, STORAGE_KEY, STORAGE_VERSION, SessionSnapshot, ShareParams,
    SharedSession, decode_from_share, decode_from_storage, encode_for_share, encode_for_storage,
};
pub use engine::{Engine, EngineOptions, Notification, TickReport};
pub use format::{format_currency, format_elapsed, format_elapsed_verbose, format_history_entry};
pub use ledger::{LedgerChange, Segment, SegmentLedger};
pub use milestone::{Axis, FiredThresholds, Milestone, MilestoneNotifier, MilestoneState};
pub use session::{ResumePolicy, Session, SessionDefaults};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use timer::{TimerClock, TimerStatus};
pub use types::{Currency, Language, Quantity, Rate, ValidationError};
