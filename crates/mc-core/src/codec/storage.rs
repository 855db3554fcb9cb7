//! Versioned session record for the local key-value store.
//!
//! Decoding is total: a record that cannot be used at all yields a fresh
//! session, and a record with some bad fields keeps its good ones. Every
//! field is read on its own, so one corrupt value never discards the rest.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::accrual::CostSegment;
use crate::ledger::{Segment, SegmentLedger};
use crate::milestone::{FiredThresholds, MilestoneState};
use crate::session::{ResumePolicy, Session, SessionDefaults};
use crate::timer::{Reconciled, TimerClock};
use crate::types::{
    Currency, Language, MAX_ELAPSED_SECS, Quantity, Rate, clamp_elapsed, clamp_elapsed_f64,
    clamp_rate, is_valid_timestamp,
};

/// Key under which the session record is stored.
pub const STORAGE_KEY: &str = "meetingCostCalculator";

/// Records with any other version are discarded.
pub const STORAGE_VERSION: &str = "1.0";

/// The persisted form of a [`Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub version: String,
    pub elapsed_time: u32,
    pub is_running: bool,
    pub start_timestamp: Option<i64>,
    pub segments: Vec<Segment>,
    pub cost_per_unit: f64,
    pub currency: Currency,
    pub language: Language,
    pub fired_time_thresholds: Vec<u32>,
    pub fired_cost_thresholds: Vec<u32>,
    pub last_save_wall_clock: i64,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Captures `session` as of `now_ms`.
///
/// A running timer's elapsed time is brought up to `now_ms` so that a later
/// reconciliation adds exactly the gap since this save.
pub fn encode_for_storage(session: &Session, now_ms: i64) -> SessionSnapshot {
    let elapsed_time = session.timer.anchor_ms().map_or_else(
        || session.elapsed_secs(),
        |anchor| clamp_elapsed(now_ms.saturating_sub(anchor).div_euclid(1000)),
    );

    SessionSnapshot {
        version: STORAGE_VERSION.to_string(),
        elapsed_time,
        is_running: session.is_running(),
        start_timestamp: session.timer.anchor_ms(),
        segments: session.ledger.segments().to_vec(),
        cost_per_unit: session.rate.amount(),
        currency: session.rate.currency(),
        language: session.language,
        fired_time_thresholds: session.milestones.time.to_vec(),
        fired_cost_thresholds: session.milestones.cost.to_vec(),
        last_save_wall_clock: now_ms,
    }
}

/// How a restore went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    /// Nothing usable was stored; the session is brand new.
    Fresh,
    /// A stored record was applied.
    Stored {
        /// Present if the record was saved while running.
        reconciled: Option<Reconciled>,
        /// The clock was restarted under [`ResumePolicy::AutoResume`].
        resumed: bool,
    },
}

/// A decoded session and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    pub session: Session,
    pub source: RestoreSource,
}

impl Restored {
    fn fresh(defaults: &SessionDefaults) -> Self {
        Self {
            session: Session::new(defaults),
            source: RestoreSource::Fresh,
        }
    }
}

/// A segment entry as found in a stored record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSegment {
    pub start_time: Option<f64>,
    pub quantity: Option<f64>,
}

impl RawSegment {
    fn from_value(value: &Value) -> Self {
        let Some(entry) = value.as_object() else {
            return Self {
                start_time: None,
                quantity: None,
            };
        };
        Self {
            start_time: field(entry, &["startTime"]).and_then(number),
            quantity: field(entry, &["quantity", "numberOfPeople"]).and_then(number),
        }
    }

    fn to_segment(self) -> Option<Segment> {
        let start = self.start_secs()?;
        let quantity = self.quantity()?;
        Some(Segment::new(start, Quantity::clamped(i64::from(quantity))))
    }
}

impl CostSegment for RawSegment {
    fn start_secs(&self) -> Option<u32> {
        self.start_time
            .filter(|v| v.is_finite())
            .map(clamp_elapsed_f64)
    }

    fn quantity(&self) -> Option<u32> {
        self.quantity
            .filter(|v| v.is_finite())
            .map(|v| Quantity::clamped_f64(v).value())
    }
}

/// Rebuilds a session from a stored record.
///
/// A record saved while running is reconciled: the wall-clock gap since
/// `lastSaveWallClock` is added to its elapsed time. Under
/// [`ResumePolicy::PauseAndNotify`] the result is paused.
pub fn decode_from_storage(
    raw: &str,
    now_ms: i64,
    defaults: &SessionDefaults,
    policy: ResumePolicy,
) -> Restored {
    let record = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(record)) => record,
        Ok(_) => {
            tracing::warn!("stored session is not an object, starting fresh");
            return Restored::fresh(defaults);
        }
        Err(e) => {
            tracing::warn!(error = %e, "stored session is not valid JSON, starting fresh");
            return Restored::fresh(defaults);
        }
    };

    let version = record.get("version").and_then(Value::as_str);
    if version != Some(STORAGE_VERSION) {
        tracing::warn!(?version, "stored session version mismatch, starting fresh");
        return Restored::fresh(defaults);
    }

    let elapsed = field(&record, &["elapsedTime"])
        .and_then(number)
        .map_or(0, clamp_elapsed_f64);

    let amount = field(&record, &["costPerUnit", "costPerPerson"])
        .and_then(number)
        .map_or(defaults.rate, clamp_rate);

    let currency = parse_or(&record, "currency", defaults.currency);
    let language = parse_or(&record, "language", defaults.language);

    let raw_segments: Vec<RawSegment> = field(&record, &["segments"])
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(RawSegment::from_value).collect())
        .unwrap_or_default();
    let segments: Vec<Segment> = raw_segments
        .iter()
        .filter_map(|raw| {
            let segment = raw.to_segment();
            if segment.is_none() {
                tracing::warn!(?raw, "dropping malformed stored segment");
            }
            segment
        })
        .collect();
    if segments.is_empty() {
        tracing::warn!("stored session has no usable segments, using seed segment");
    }
    let mut ledger = SegmentLedger::from_segments(segments, defaults.quantity);

    let milestones = MilestoneState {
        time: thresholds(&record, "firedTimeThresholds"),
        cost: thresholds(&record, "firedCostThresholds"),
    };

    let was_running = record
        .get("isRunning")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let last_save =
        timestamp(&record, &["lastSaveWallClock", "lastSaveTime"]).unwrap_or_else(|| {
            if was_running {
                tracing::warn!("stored session has no usable save time, assuming no gap");
            }
            now_ms
        });
    let stored_anchor = timestamp(&record, &["startTimestamp"]);

    let mut timer = TimerClock::new();
    let reconciled = timer.reconcile_after_suspend(now_ms, last_save, was_running, elapsed);
    let resumed = was_running
        && policy == ResumePolicy::AutoResume
        && resume_reconciled(&mut timer, stored_anchor, now_ms);
    if was_running {
        tracing::info!(
            elapsed = reconciled.elapsed_secs,
            gap = reconciled.gap_secs,
            resumed,
            "reconciled running session after suspend"
        );
    }

    let dropped = ledger.truncate_after(timer.elapsed_secs());
    if dropped > 0 {
        tracing::warn!(dropped, "dropped stored segments starting after elapsed time");
    }

    Restored {
        session: Session {
            timer,
            ledger,
            rate: Rate::new(amount, currency),
            milestones,
            language,
        },
        source: RestoreSource::Stored {
            reconciled: was_running.then_some(reconciled),
            resumed,
        },
    }
}

/// Looks up the first present key among `names`.
fn field<'a>(record: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| record.get(*name))
}

/// Reads a number, accepting numeric strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a wall-clock timestamp, rejecting values outside the plausible range.
fn timestamp(record: &Map<String, Value>, names: &[&str]) -> Option<i64> {
    field(record, names)
        .and_then(number)
        .filter(|v| v.is_finite())
        .map(as_millis)
        .filter(|&ms| is_valid_timestamp(ms))
}

/// Restarts a reconciled timer.
///
/// The stored anchor is kept when it agrees with the reconciled elapsed time,
/// so progress below a whole second survives the reload. Otherwise the timer
/// restarts from its whole-second elapsed time.
fn resume_reconciled(timer: &mut TimerClock, stored_anchor: Option<i64>, now_ms: i64) -> bool {
    let reconciled = i64::from(timer.elapsed_secs());
    let consistent = stored_anchor.filter(|&anchor| {
        let from_anchor = now_ms.saturating_sub(anchor).div_euclid(1000);
        (reconciled..=reconciled + 1).contains(&from_anchor)
    });
    match consistent {
        Some(anchor) if timer.elapsed_secs() < MAX_ELAPSED_SECS => {
            timer.resume_from_anchor(anchor, now_ms);
            !timer.tick(now_ms).capped
        }
        _ => timer.start(now_ms),
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "wall-clock milliseconds fit comfortably in i64"
)]
fn as_millis(value: f64) -> i64 {
    value.trunc() as i64
}

fn parse_or<T: std::str::FromStr>(record: &Map<String, Value>, name: &str, default: T) -> T {
    match record.get(name) {
        None => default,
        Some(value) => value.as_str().and_then(|s| s.parse().ok()).unwrap_or_else(|| {
            tracing::warn!(field = name, %value, "unusable stored value, using default");
            default
        }),
    }
}

fn thresholds(record: &Map<String, Value>, name: &str) -> FiredThresholds {
    record
        .get(name)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|v| u32::try_from(v).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn defaults() -> SessionDefaults {
        SessionDefaults::default()
    }

    fn running_session() -> Session {
        let mut session = Session::new(&defaults());
        session.timer.start(NOW - 600_000);
        session.timer.tick(NOW - 300_000);
        session.ledger.add_or_update(4, 120, true);
        session.milestones.time.insert(300);
        session
    }

    #[test]
    fn encode_snapshot_shape() {
        let mut session = Session::new(&defaults());
        session.timer.start(NOW - 90_000);
        session.timer.pause(NOW);
        session.milestones.cost.insert(50);

        let json = serde_json::to_string_pretty(&encode_for_storage(&session, NOW)).unwrap();
        insta::assert_snapshot!(json, @r#"
        {
          "version": "1.0",
          "elapsedTime": 90,
          "isRunning": false,
          "startTimestamp": null,
          "segments": [
            {
              "startTime": 0,
              "quantity": 2
            }
          ],
          "costPerUnit": 65.0,
          "currency": "EUR",
          "language": "en",
          "firedTimeThresholds": [],
          "firedCostThresholds": [
            50
          ],
          "lastSaveWallClock": 1700000000000
        }
        "#);
    }

    #[test]
    fn encode_brings_running_elapsed_up_to_now() {
        let session = running_session();
        let snapshot = encode_for_storage(&session, NOW);
        assert_eq!(snapshot.elapsed_time, 600);
        assert!(snapshot.is_running);
        assert_eq!(snapshot.start_timestamp, Some(NOW - 600_000));
    }

    #[test]
    fn paused_roundtrip_preserves_session() {
        let mut session = running_session();
        session.timer.pause(NOW);
        let json = encode_for_storage(&session, NOW).to_json().unwrap();

        let restored = decode_from_storage(&json, NOW + 5_000, &defaults(), ResumePolicy::default());
        assert_eq!(restored.session, session);
        assert_eq!(
            restored.source,
            RestoreSource::Stored {
                reconciled: None,
                resumed: false
            }
        );
    }

    #[test]
    fn running_record_is_reconciled_and_paused() {
        let raw = serde_json::json!({
            "version": "1.0",
            "elapsedTime": 300,
            "isRunning": true,
            "startTimestamp": NOW - 420_000,
            "segments": [{"startTime": 0, "quantity": 2}],
            "costPerUnit": 65,
            "currency": "EUR",
            "firedTimeThresholds": [300],
            "firedCostThresholds": [],
            "lastSaveWallClock": NOW - 120_000
        })
        .to_string();

        let restored = decode_from_storage(&raw, NOW, &defaults(), ResumePolicy::PauseAndNotify);
        assert_eq!(restored.session.elapsed_secs(), 420);
        assert!(!restored.session.is_running());
        assert!(restored.session.milestones.time.contains(300));
        match restored.source {
            RestoreSource::Stored {
                reconciled: Some(reconciled),
                resumed: false,
            } => assert_eq!(reconciled.gap_secs, 120),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn auto_resume_policy_keeps_running() {
        let json = encode_for_storage(&running_session(), NOW - 60_000)
            .to_json()
            .unwrap();
        let restored = decode_from_storage(&json, NOW, &defaults(), ResumePolicy::AutoResume);
        assert!(restored.session.is_running());
        assert_eq!(restored.session.elapsed_secs(), 600);
        assert_eq!(restored.session.timer.anchor_ms(), Some(NOW - 600_000));
    }

    #[test]
    fn auto_resume_keeps_sub_second_anchor() {
        let raw = serde_json::json!({
            "version": "1.0",
            "elapsedTime": 10,
            "isRunning": true,
            "startTimestamp": NOW - 10_900,
            "lastSaveWallClock": NOW - 500
        })
        .to_string();

        let restored = decode_from_storage(&raw, NOW, &defaults(), ResumePolicy::AutoResume);
        assert_eq!(restored.session.timer.anchor_ms(), Some(NOW - 10_900));
        assert_eq!(restored.session.elapsed_secs(), 10);
    }

    #[test]
    fn auto_resume_ignores_inconsistent_anchor() {
        let raw = serde_json::json!({
            "version": "1.0",
            "elapsedTime": 10,
            "isRunning": true,
            "startTimestamp": NOW - 3_600_000,
            "lastSaveWallClock": NOW
        })
        .to_string();

        let restored = decode_from_storage(&raw, NOW, &defaults(), ResumePolicy::AutoResume);
        assert_eq!(restored.session.timer.anchor_ms(), Some(NOW - 10_000));
    }

    #[test]
    fn extreme_save_time_assumes_no_gap() {
        for last_save in [-1e300, 1e300, 0.0] {
            let raw = serde_json::json!({
                "version": "1.0",
                "elapsedTime": 300,
                "isRunning": true,
                "lastSaveWallClock": last_save
            })
            .to_string();

            let restored = decode_from_storage(&raw, NOW, &defaults(), ResumePolicy::AutoResume);
            assert_eq!(restored.session.elapsed_secs(), 300, "lastSaveWallClock: {last_save}");
            assert!(restored.session.is_running());
        }
    }

    #[test]
    fn version_mismatch_starts_fresh() {
        let raw = r#"{"version":"0.9","elapsedTime":300}"#;
        let restored = decode_from_storage(raw, NOW, &defaults(), ResumePolicy::default());
        assert_eq!(restored.source, RestoreSource::Fresh);
        assert_eq!(restored.session, Session::new(&defaults()));
    }

    #[test]
    fn garbage_starts_fresh() {
        for raw in ["", "not json", "[1,2,3]", "null"] {
            let restored = decode_from_storage(raw, NOW, &defaults(), ResumePolicy::default());
            assert_eq!(restored.source, RestoreSource::Fresh, "input: {raw:?}");
        }
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "clamped values are exact"
    )]
    fn out_of_range_fields_are_clamped() {
        let raw = serde_json::json!({
            "version": "1.0",
            "elapsedTime": 999_999,
            "isRunning": false,
            "segments": [{"startTime": 0, "quantity": 5000}],
            "costPerUnit": -40,
            "currency": "XYZ",
            "language": 7
        })
        .to_string();

        let restored = decode_from_storage(&raw, NOW, &defaults(), ResumePolicy::default());
        let session = restored.session;
        assert_eq!(session.elapsed_secs(), MAX_ELAPSED_SECS);
        assert_eq!(session.ledger.current_quantity().value(), 999);
        assert_eq!(session.rate.amount(), 0.0);
        assert_eq!(session.rate.currency(), Currency::Eur);
        assert_eq!(session.language, Language::En);
    }

    #[test]
    fn malformed_segments_are_dropped() {
        let raw = serde_json::json!({
            "version": "1.0",
            "elapsedTime": 600,
            "segments": [
                {"startTime": 0, "quantity": 3},
                {"startTime": "oops", "quantity": 9},
                "not a segment",
                {"startTime": 300, "numberOfPeople": "5"}
            ]
        })
        .to_string();

        let restored = decode_from_storage(&raw, NOW, &defaults(), ResumePolicy::default());
        let segments: Vec<(u32, u32)> = restored
            .session
            .ledger
            .segments()
            .iter()
            .map(|s| (s.start_time, s.quantity.value()))
            .collect();
        assert_eq!(segments, vec![(0, 3), (300, 5)]);
    }

    #[test]
    fn empty_segments_use_seed() {
        let raw = r#"{"version":"1.0","elapsedTime":10,"segments":[]}"#;
        let restored = decode_from_storage(raw, NOW, &defaults(), ResumePolicy::default());
        assert_eq!(restored.session.ledger.len(), 1);
        assert_eq!(restored.session.ledger.current_quantity().value(), 2);
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "legacy value is exact"
    )]
    fn legacy_cost_field_is_accepted() {
        let raw = r#"{"version":"1.0","costPerPerson":"80"}"#;
        let restored = decode_from_storage(raw, NOW, &defaults(), ResumePolicy::default());
        assert_eq!(restored.session.rate.amount(), 80.0);
    }

    #[test]
    fn raw_segment_reports_missing_fields() {
        let raw = RawSegment::from_value(&serde_json::json!({"startTime": 12.7}));
        assert_eq!(raw.start_secs(), Some(12));
        assert_eq!(raw.quantity(), None);
    }
}
