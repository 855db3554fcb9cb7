//! Shareable session links.
//!
//! A link carries the wall-clock anchor rather than the elapsed time, so a
//! running meeting keeps counting while the link sits unopened in a chat.
//! The encoder's timezone offset travels along and the receiver shifts the
//! anchor by the difference between the two offsets.
//!
//! Query format: `lang`, `start`, `tz`, `people` or `segments`
//! (`start:qty,start:qty,...`), `cost`, `currency`, `running` (`0`/`1`).

use url::Url;
use url::form_urlencoded;

use crate::ledger::{Segment, SegmentLedger};
use crate::milestone::MilestoneState;
use crate::session::{Session, SessionDefaults};
use crate::timer::TimerClock;
use crate::types::{
    Currency, Language, Quantity, Rate, clamp_elapsed, clamp_elapsed_f64, clamp_rate,
    is_valid_timestamp,
};

/// Query parameter names.
pub mod param {
    pub const LANGUAGE: &str = "lang";
    pub const START: &str = "start";
    pub const TIMEZONE: &str = "tz";
    pub const PEOPLE: &str = "people";
    pub const SEGMENTS: &str = "segments";
    pub const COST: &str = "cost";
    pub const CURRENCY: &str = "currency";
    pub const RUNNING: &str = "running";
}

/// Largest plausible timezone offset magnitude in minutes.
const MAX_TZ_OFFSET_MINUTES: i32 = 16 * 60;

/// Validated share-link parameters. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShareParams {
    pub language: Option<Language>,
    /// Wall-clock anchor in the encoder's frame.
    pub start_ms: Option<i64>,
    /// Encoder's offset, UTC minus local, in minutes.
    pub timezone_offset_minutes: Option<i32>,
    pub people: Option<Quantity>,
    pub segments: Option<Vec<Segment>>,
    pub cost: Option<f64>,
    pub currency: Option<Currency>,
    pub running: Option<bool>,
}

impl ShareParams {
    /// Parses a query string (with or without a leading `?`).
    ///
    /// Unknown keys are ignored and each known key is validated on its own;
    /// an invalid value is dropped with a warning. If a key repeats, the last
    /// value wins.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut params = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                param::LANGUAGE => params.language = parse_field(&key, value, |v| v.parse().ok()),
                param::START => params.start_ms = parse_field(&key, value, parse_timestamp),
                param::TIMEZONE => {
                    params.timezone_offset_minutes = parse_field(&key, value, parse_tz_offset);
                }
                param::PEOPLE => params.people = parse_field(&key, value, parse_quantity),
                param::SEGMENTS => params.segments = parse_field(&key, value, parse_segments),
                param::COST => params.cost = parse_field(&key, value, parse_cost),
                param::CURRENCY => params.currency = parse_field(&key, value, |v| v.parse().ok()),
                param::RUNNING => params.running = parse_field(&key, value, parse_running),
                _ => {}
            }
        }
        params
    }

    /// Parses a full link or a bare query string.
    pub fn from_link(link: &str) -> Self {
        match Url::parse(link.trim()) {
            Ok(url) => Self::from_query(url.query().unwrap_or_default()),
            Err(_) => {
                let query = link.split_once('?').map_or(link, |(_, q)| q);
                Self::from_query(query)
            }
        }
    }

    /// True if the link carries anything beyond the interface language.
    pub const fn has_session_data(&self) -> bool {
        self.start_ms.is_some()
            || self.people.is_some()
            || self.segments.is_some()
            || self.cost.is_some()
            || self.currency.is_some()
            || self.running.is_some()
    }

    /// Renders the parameters as an `application/x-www-form-urlencoded` query.
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(language) = self.language {
            query.append_pair(param::LANGUAGE, language.as_str());
        }
        if let Some(start) = self.start_ms {
            query.append_pair(param::START, &start.to_string());
        }
        if let Some(tz) = self.timezone_offset_minutes {
            query.append_pair(param::TIMEZONE, &tz.to_string());
        }
        if let Some(segments) = &self.segments {
            query.append_pair(param::SEGMENTS, &format_segments(segments));
        } else if let Some(people) = self.people {
            query.append_pair(param::PEOPLE, &people.to_string());
        }
        if let Some(cost) = self.cost {
            query.append_pair(param::COST, &cost.to_string());
        }
        if let Some(currency) = self.currency {
            query.append_pair(param::CURRENCY, currency.as_str());
        }
        if let Some(running) = self.running {
            query.append_pair(param::RUNNING, if running { "1" } else { "0" });
        }
        query.finish()
    }

    /// `base` with its query replaced by these parameters.
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(Some(&self.to_query()));
        url
    }
}

/// Builds link parameters for `session` as of `now_ms`.
///
/// `start` is the effective anchor, omitted for a session that has never
/// run. A single-segment ledger is sent as `people`, anything longer as
/// `segments`.
pub fn encode_for_share(session: &Session, now_ms: i64, timezone_offset_minutes: i32) -> ShareParams {
    let start_ms = if session.is_running() || session.elapsed_secs() > 0 {
        Some(session.timer.effective_anchor_ms(now_ms)).filter(|&ms| is_valid_timestamp(ms))
    } else {
        None
    };

    let (people, segments) = if session.ledger.len() == 1 {
        (Some(session.ledger.current_quantity()), None)
    } else {
        (None, Some(session.ledger.segments().to_vec()))
    };

    ShareParams {
        language: Some(session.language),
        start_ms,
        timezone_offset_minutes: Some(timezone_offset_minutes),
        people,
        segments,
        cost: Some(session.rate.amount()),
        currency: Some(session.rate.currency()),
        running: Some(session.is_running()),
    }
}

/// A session decoded from a share link.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedSession {
    pub session: Session,
    /// The corrected anchor lay in the future; elapsed was reset to zero.
    pub clock_drift: bool,
}

/// Rebuilds a session from link parameters.
///
/// Returns `None` when the link carries no session data, so the caller can
/// keep whatever it already has.
pub fn decode_from_share(
    params: &ShareParams,
    now_ms: i64,
    receiver_offset_minutes: i32,
    defaults: &SessionDefaults,
) -> Option<SharedSession> {
    if !params.has_session_data() {
        tracing::debug!("share link carries no session data");
        return None;
    }

    let mut clock_drift = false;
    let mut timer = TimerClock::new();

    if let Some(start_ms) = params.start_ms {
        let encoded_offset = params.timezone_offset_minutes.unwrap_or(0);
        let timezone_diff_ms = i64::from(receiver_offset_minutes - encoded_offset) * 60_000;
        let mut anchor = start_ms + timezone_diff_ms;
        let mut elapsed = (now_ms - anchor).div_euclid(1000);

        if elapsed < 0 {
            tracing::warn!(elapsed, "share link anchor lies in the future, resetting");
            clock_drift = true;
            elapsed = 0;
            anchor = now_ms;
        }

        if params.running == Some(true) {
            timer.resume_from_anchor(anchor, now_ms);
            // Caps and pauses a link that has been running for over a day
            timer.tick(now_ms);
        } else {
            timer = TimerClock::paused_at(clamp_elapsed(elapsed));
        }
    }

    let seed = params.people.unwrap_or(defaults.quantity);
    let mut ledger = params.segments.as_ref().map_or_else(
        || SegmentLedger::new(seed),
        |segments| SegmentLedger::from_segments(segments.iter().copied(), seed),
    );
    ledger.truncate_after(timer.elapsed_secs());

    let session = Session {
        timer,
        ledger,
        rate: Rate::new(
            params.cost.unwrap_or(defaults.rate),
            params.currency.unwrap_or(defaults.currency),
        ),
        milestones: MilestoneState::default(),
        language: params.language.unwrap_or(defaults.language),
    };

    Some(SharedSession {
        session,
        clock_drift,
    })
}

fn parse_field<T>(key: &str, value: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(value);
    if parsed.is_none() {
        tracing::warn!(key, value, "ignoring invalid share link parameter");
    }
    parsed
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "timestamp range is validated before the cast result is used"
)]
fn parse_timestamp(value: &str) -> Option<i64> {
    let ms = value
        .parse::<i64>()
        .ok()
        .or_else(|| parse_number(value).map(|v| v.trunc() as i64))?;
    is_valid_timestamp(ms).then_some(ms)
}

fn parse_tz_offset(value: &str) -> Option<i32> {
    value
        .parse::<i32>()
        .ok()
        .filter(|v| v.abs() <= MAX_TZ_OFFSET_MINUTES)
}

fn parse_quantity(value: &str) -> Option<Quantity> {
    parse_number(value).map(Quantity::clamped_f64)
}

fn parse_cost(value: &str) -> Option<f64> {
    parse_number(value).map(clamp_rate)
}

fn parse_running(value: &str) -> Option<bool> {
    match value {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Parses `start:qty,start:qty`, skipping malformed entries.
fn parse_segments(value: &str) -> Option<Vec<Segment>> {
    let segments: Vec<Segment> = value
        .split(',')
        .filter_map(|entry| {
            let (start, quantity) = entry.split_once(':')?;
            let start = parse_number(start.trim())?;
            let quantity = parse_number(quantity.trim())?;
            Some(Segment::new(
                clamp_elapsed_f64(start),
                Quantity::clamped_f64(quantity),
            ))
        })
        .collect();
    (!segments.is_empty()).then_some(segments)
}

fn format_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| format!("{}:{}", s.start_time, s.quantity))
        .collect::<Vec<_>>()
        .join(",")
}
