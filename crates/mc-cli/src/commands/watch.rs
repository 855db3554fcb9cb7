//! Foreground loop that follows a running meeting.
//!
//! The loop owns the engine. Keyboard input arrives line by line from a
//! reader thread over a channel; the loop waits on that channel with the next
//! tick deadline as its timeout.

use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use mc_core::format::plural;
use mc_core::{Clock, Engine, KeyValueStore, TimerStatus, format_currency, format_elapsed};

use crate::render;

const HELP: &str = "keys: s start/pause, + add person, - remove person, r reset, q quit";

/// A keyboard command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Toggle,
    Join,
    Leave,
    Reset,
    Quit,
    Help,
}

impl Key {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "s" | "S" => Some(Self::Toggle),
            "+" | "=" => Some(Self::Join),
            "-" | "_" => Some(Self::Leave),
            "r" | "R" => Some(Self::Reset),
            "q" | "Q" => Some(Self::Quit),
            "h" | "?" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Spawns a thread forwarding stdin lines. The channel closes at end of input.
pub fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Runs until `q` or the input closes.
pub fn run<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
    start: bool,
    input: &Receiver<String>,
) -> Result<()> {
    if start {
        engine.start();
    }
    writeln!(writer, "{HELP}")?;
    emit(writer, engine)?;

    let idle = Duration::from_millis(engine.tick_interval_ms());
    loop {
        let timeout = engine.next_tick_in().map_or(idle, Duration::from_millis);
        match input.recv_timeout(timeout) {
            Ok(line) => {
                let Some(key) = Key::parse(&line) else {
                    if !line.trim().is_empty() {
                        writeln!(writer, "unknown key {:?}; {HELP}", line.trim())?;
                    }
                    continue;
                };
                tracing::debug!(?key, "watch input");
                match key {
                    Key::Toggle => {
                        engine.toggle();
                    }
                    Key::Join => {
                        engine.adjust_quantity(1);
                    }
                    Key::Leave => {
                        engine.adjust_quantity(-1);
                    }
                    Key::Reset => engine.reset(),
                    Key::Quit => break,
                    Key::Help => {
                        writeln!(writer, "{HELP}")?;
                        continue;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                engine.tick();
                engine.flush_if_due();
                if !engine.session().is_running() {
                    continue;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
        emit(writer, engine)?;
    }

    engine.flush();
    let currency = engine.session().rate.currency();
    render::write_notifications(writer, &engine.take_notifications(), currency)?;
    Ok(())
}

/// Prints queued notifications followed by a status line.
fn emit<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
) -> Result<()> {
    let currency = engine.session().rate.currency();
    render::write_notifications(writer, &engine.take_notifications(), currency)?;
    writeln!(writer, "{}", status_line(engine))?;
    writer.flush()?;
    Ok(())
}

fn status_line<C: Clock, S: KeyValueStore>(engine: &Engine<C, S>) -> String {
    let session = engine.session();
    let quantity = session.ledger.current_quantity().value();
    let label = match session.timer.status() {
        TimerStatus::Stopped => "stopped",
        TimerStatus::Running => "running",
        TimerStatus::Paused => "paused",
    };
    format!(
        "[{label}] {} | {} | {quantity} {}",
        format_elapsed(session.elapsed_secs()),
        format_currency(session.total_cost(), session.rate.currency()),
        plural(quantity, "person", "persons")
    )
}
