//! Share links: printing one for the current meeting and loading one.

use std::io::Write;

use anyhow::{Context, Result};
use mc_core::format::plural;
use mc_core::{Clock, Engine, KeyValueStore, ShareParams, format_currency, format_elapsed};
use url::Url;

/// Prints a link to the current meeting, or the bare query string when no
/// base URL is configured.
pub fn run<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &Engine<C, S>,
    base_url: Option<&str>,
) -> Result<()> {
    let params = engine.share_params();
    match base_url {
        Some(base) => {
            let base = Url::parse(base)
                .with_context(|| format!("invalid share_base_url: {base}"))?;
            writeln!(writer, "{}", params.to_url(&base))?;
        }
        None => writeln!(writer, "?{}", params.to_query())?,
    }
    Ok(())
}

/// Applies a share link to the local session.
pub fn open<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
    link: &str,
) -> Result<()> {
    let params = ShareParams::from_link(link);
    if !engine.load_share(&params) {
        writeln!(writer, "Link carries no meeting data; local session unchanged")?;
        return Ok(());
    }

    let session = engine.session();
    let quantity = session.ledger.current_quantity().value();
    writeln!(
        writer,
        "{} at {}, {quantity} {}, {}",
        if session.is_running() { "Running" } else { "Paused" },
        format_elapsed(session.elapsed_secs()),
        plural(quantity, "person", "persons"),
        format_currency(session.total_cost(), session.rate.currency())
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_core::{EngineOptions, ManualClock, MemoryStore};

    const NOW: i64 = 1_700_000_000_000;

    fn engine(clock: &ManualClock) -> Engine<ManualClock, MemoryStore> {
        Engine::new(
            clock.clone(),
            Some(MemoryStore::new()),
            EngineOptions::default(),
        )
    }

    #[test]
    fn share_prints_query_or_url() {
        let clock = ManualClock::new(NOW);
        let mut engine = engine(&clock);
        engine.add_or_update(3);

        let mut out = Vec::new();
        run(&mut out, &engine, None).unwrap();
        run(&mut out, &engine, Some("https://example.com/calc/")).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "?lang=en&tz=0&people=3&cost=65&currency=EUR&running=0\n\
             https://example.com/calc/?lang=en&tz=0&people=3&cost=65&currency=EUR&running=0\n"
        );
    }

    #[test]
    fn share_rejects_bad_base_url() {
        let clock = ManualClock::new(NOW);
        let engine = engine(&clock);
        let mut out = Vec::new();
        assert!(run(&mut out, &engine, Some("not a url")).is_err());
    }

    #[test]
    fn open_applies_link_from_another_timezone() {
        let sender_clock = ManualClock::new(NOW).with_offset_minutes(-60);
        let mut sender = engine(&sender_clock);
        sender.add_or_update(4);
        sender.start();
        sender_clock.advance_secs(900);
        let mut link = Vec::new();
        run(&mut link, &sender, Some("https://example.com/")).unwrap();
        let link = String::from_utf8(link).unwrap();

        let receiver_clock = ManualClock::new(NOW + 900_000).with_offset_minutes(-60);
        let mut receiver = engine(&receiver_clock);
        let mut out = Vec::new();
        open(&mut out, &mut receiver, link.trim()).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Running at 15m 0s, 4 persons, 65,00 €\n"
        );
    }

    #[test]
    fn open_ignores_link_without_session_data() {
        let clock = ManualClock::new(NOW);
        let mut engine = engine(&clock);
        engine.add_or_update(7);

        let mut out = Vec::new();
        open(&mut out, &mut engine, "https://example.com/?lang=fr").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Link carries no meeting data; local session unchanged\n"
        );
        assert_eq!(engine.session().ledger.current_quantity().value(), 7);
    }
}
