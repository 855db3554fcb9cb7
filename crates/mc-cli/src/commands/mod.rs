//! Command implementations.

pub mod session;
pub mod share;
pub mod status;
pub mod watch;

use std::io::Write;

use anyhow::{Context, Result};
use mc_core::{Clock, Engine, KeyValueStore, SystemClock};
use mc_store::Database;

use crate::Config;
use crate::render;

/// The engine as the binary runs it.
pub type CliEngine = Engine<SystemClock, Database>;

/// Opens the database, ensuring its directory exists, and restores the
/// stored session.
pub fn open_engine(config: &Config) -> Result<CliEngine> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    let mut engine = Engine::new(SystemClock, Some(db), config.engine_options());
    let source = engine.restore();
    tracing::debug!(?source, "session loaded");
    Ok(engine)
}

/// Writes pending changes and prints whatever the engine wants to say.
pub fn finish<W: Write, C: Clock, S: KeyValueStore>(
    writer: &mut W,
    engine: &mut Engine<C, S>,
) -> Result<()> {
    engine.flush();
    let currency = engine.session().rate.currency();
    render::write_notifications(writer, &engine.take_notifications(), currency)
        .context("failed to write notifications")?;
    Ok(())
}
