//! One-shot commands that change the session.

use std::io::Write;

use anyhow::Result;
use mc_core::format::plural;
use mc_core::{
    Clock, Currency, Engine, KeyValueStore, Language, LedgerChange, format_currency,
    format_elapsed,
};

pub fn start<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
) -> Result<()> {
    let elapsed = format_elapsed(engine.elapsed_time());
    if engine.start() {
        writeln!(writer, "Started at {elapsed}")?;
    } else if engine.session().is_running() {
        writeln!(writer, "Already running ({elapsed})")?;
    } else {
        writeln!(
            writer,
            "Meeting reached the 24 hour limit; reset it to start again"
        )?;
    }
    Ok(())
}

pub fn pause<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
) -> Result<()> {
    if engine.pause() {
        write_paused(writer, engine)?;
    } else {
        writeln!(writer, "Not running")?;
    }
    Ok(())
}

pub fn toggle<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
) -> Result<()> {
    if engine.toggle() {
        writeln!(
            writer,
            "Running from {}",
            format_elapsed(engine.elapsed_time())
        )?;
    } else {
        write_paused(writer, engine)?;
    }
    Ok(())
}

pub fn reset<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
) -> Result<()> {
    engine.reset();
    let quantity = engine.session().ledger.current_quantity().value();
    writeln!(
        writer,
        "Meeting reset ({quantity} {})",
        plural(quantity, "person", "persons")
    )?;
    Ok(())
}

/// Sets an absolute participant count.
pub fn people<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
    count: u32,
) -> Result<()> {
    let change = engine.add_or_update(i64::from(count));
    write_change(writer, engine, change)
}

/// Adds (positive) or removes (negative) participants.
pub fn adjust<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
    delta: i64,
) -> Result<()> {
    let change = engine.adjust_quantity(delta);
    write_change(writer, engine, change)
}

pub fn rate<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
    amount: f64,
    currency: Option<Currency>,
) -> Result<()> {
    if let Some(currency) = currency {
        engine.set_currency(currency);
    }
    engine.set_rate(amount);
    let rate = engine.session().rate;
    writeln!(
        writer,
        "Rate: {} per person/hour",
        format_currency(rate.amount(), rate.currency())
    )?;
    Ok(())
}

pub fn currency<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
    currency: Currency,
) -> Result<()> {
    engine.set_currency(currency);
    writeln!(
        writer,
        "Currency: {currency} (total {})",
        format_currency(engine.total_cost(), currency)
    )?;
    Ok(())
}

pub fn language<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
    language: Language,
) -> Result<()> {
    engine.set_language(language);
    writeln!(writer, "Language: {language}")?;
    Ok(())
}

fn write_paused<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &Engine<C, S>,
) -> Result<()> {
    writeln!(
        writer,
        "Paused at {}, total {}",
        format_elapsed(engine.elapsed_time()),
        format_currency(engine.total_cost(), engine.session().rate.currency())
    )?;
    Ok(())
}

fn write_change<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &Engine<C, S>,
    change: LedgerChange,
) -> Result<()> {
    let quantity = engine.session().ledger.current_quantity().value();
    if change == LedgerChange::Unchanged {
        writeln!(writer, "Participants unchanged: {quantity}")?;
    } else {
        writeln!(writer, "Participants: {quantity}")?;
    }
    Ok(())
}
