//! Status command for showing the current meeting.

use std::io::Write;

use anyhow::{Context, Result};
use mc_core::{
    Clock, Currency, Engine, KeyValueStore, Language, Notification, TimerStatus, format_currency,
    format_elapsed, format_history_entry, segment_costs,
};
use serde::Serialize;

use crate::render;

#[derive(Debug, Serialize)]
struct StatusReport {
    status: TimerStatus,
    elapsed_secs: u32,
    total_cost: f64,
    currency: Currency,
    language: Language,
    participants: u32,
    rate: f64,
    segments: Vec<SegmentReport>,
    fired_time_thresholds: Vec<u32>,
    fired_cost_thresholds: Vec<u32>,
    notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
struct SegmentReport {
    start_secs: u32,
    duration_secs: u32,
    participants: u32,
    cost: f64,
}

pub fn run<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
    json: bool,
) -> Result<()> {
    // Bring a running clock up to date before reporting.
    engine.tick();
    let notifications = engine.take_notifications();

    let session = engine.session();
    let currency = session.rate.currency();
    let costs = segment_costs(
        session.ledger.segments(),
        session.elapsed_secs(),
        session.rate.amount(),
    );

    if json {
        let report = StatusReport {
            status: session.timer.status(),
            elapsed_secs: session.elapsed_secs(),
            total_cost: session.total_cost(),
            currency,
            language: session.language,
            participants: session.ledger.current_quantity().value(),
            rate: session.rate.amount(),
            segments: costs
                .iter()
                .map(|c| SegmentReport {
                    start_secs: c.start_secs,
                    duration_secs: c.duration_secs,
                    participants: c.quantity,
                    cost: c.cost,
                })
                .collect(),
            fired_time_thresholds: session.milestones.time.to_vec(),
            fired_cost_thresholds: session.milestones.cost.to_vec(),
            notifications,
        };
        let output = serde_json::to_string_pretty(&report).context("failed to serialize status")?;
        writeln!(writer, "{output}")?;
        return Ok(());
    }

    writeln!(writer, "{:<14}{}", "Status:", status_label(session.timer.status()))?;
    writeln!(writer, "{:<14}{}", "Elapsed:", format_elapsed(session.elapsed_secs()))?;
    writeln!(
        writer,
        "{:<14}{}",
        "Total cost:",
        format_currency(session.total_cost(), currency)
    )?;
    writeln!(
        writer,
        "{:<14}{}",
        "Participants:",
        session.ledger.current_quantity()
    )?;
    writeln!(
        writer,
        "{:<14}{} per person/hour",
        "Rate:",
        format_currency(session.rate.amount(), currency)
    )?;

    writeln!(writer, "History:")?;
    for (index, segment) in session.ledger.segments().iter().enumerate() {
        let cost = costs
            .iter()
            .find(|c| c.start_secs == segment.start_time)
            .map_or(0.0, |c| c.cost);
        writeln!(
            writer,
            "  - {} ({})",
            format_history_entry(segment, index),
            format_currency(cost, currency)
        )?;
    }

    let time: Vec<String> = session.milestones.time.iter().map(format_elapsed).collect();
    let cost: Vec<String> = session
        .milestones
        .cost
        .iter()
        .map(|v| format_currency(f64::from(v), currency))
        .collect();
    let milestones = match (time.is_empty(), cost.is_empty()) {
        (true, true) => "none".to_string(),
        (false, true) => time.join(", "),
        (true, false) => cost.join(", "),
        (false, false) => format!("{} | {}", time.join(", "), cost.join(", ")),
    };
    writeln!(writer, "{:<14}{milestones}", "Milestones:")?;

    let messages: Vec<String> = notifications
        .iter()
        .filter_map(|n| render::notification(n, currency))
        .collect();
    if !messages.is_empty() {
        writeln!(writer, "Notices:")?;
        for message in messages {
            writeln!(writer, "  - {message}")?;
        }
    }

    Ok(())
}

const fn status_label(status: TimerStatus) -> &'static str {
    match status {
        TimerStatus::Stopped => "stopped",
        TimerStatus::Running => "running",
        TimerStatus::Paused => "paused",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use mc_core::{EngineOptions, ManualClock, MemoryStore};

    fn engine() -> (Engine<ManualClock, MemoryStore>, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        let engine = Engine::new(
            clock.clone(),
            Some(MemoryStore::new()),
            EngineOptions::default(),
        );
        (engine, clock)
    }

    fn render(engine: &mut Engine<ManualClock, MemoryStore>, json: bool) -> String {
        let mut output = Vec::new();
        run(&mut output, engine, json).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn status_of_fresh_session() {
        let (mut engine, _clock) = engine();

        assert_snapshot!(render(&mut engine, false), @r"
        Status:       stopped
        Elapsed:      0s
        Total cost:   0,00 €
        Participants: 2
        Rate:         65,00 € per person/hour
        History:
          - Start: 2 persons (0,00 €)
        Milestones:   none
        ");
    }

    #[test]
    fn status_shows_history_milestones_and_notices() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance_secs(1800);
        engine.add_or_update(4);
        clock.advance_secs(1800);

        assert_snapshot!(render(&mut engine, false), @r"
        Status:       running
        Elapsed:      1h 0m 0s
        Total cost:   195,00 €
        Participants: 4
        Rate:         65,00 € per person/hour
        History:
          - Start: 2 persons (65,00 €)
          - 30 minutes 0 seconds: 4 persons (130,00 €)
        Milestones:   5m 0s, 15m 0s, 30m 0s, 45m 0s, 1h 0m 0s | 50,00 €, 100,00 €
        Notices:
          - 2 persons joined the meeting
          - Milestone: 5 minutes 0 seconds elapsed
          - Milestone: 15 minutes 0 seconds elapsed
          - Milestone: 30 minutes 0 seconds elapsed
          - Milestone: 45 minutes 0 seconds elapsed
          - Milestone: 1 hour 0 minutes elapsed
          - Milestone: 50,00 € spent
          - Milestone: 100,00 € spent
        ");
    }

    #[test]
    fn status_json_reports_segments() {
        let (mut engine, clock) = engine();
        engine.set_currency(Currency::Usd);
        engine.start();
        clock.advance_secs(1800);
        engine.pause();

        let value: serde_json::Value = serde_json::from_str(&render(&mut engine, true)).unwrap();
        assert_eq!(value["status"], "paused");
        assert_eq!(value["elapsed_secs"], 1800);
        assert_eq!(value["total_cost"], 65.0);
        assert_eq!(value["currency"], "USD");
        assert_eq!(value["segments"][0]["duration_secs"], 1800);
        assert_eq!(value["fired_time_thresholds"], serde_json::json!([]));
    }
}
