use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mc_cli::commands::{self, CliEngine, session, share, status, watch};
use mc_cli::{Cli, Commands, Config};

/// Load config and open the engine on the configured database.
fn open_engine(config_path: Option<&Path>) -> Result<(CliEngine, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let engine = commands::open_engine(&config)?;
    Ok((engine, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut engine, config) = open_engine(cli.config.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Start => session::start(&mut out, &mut engine)?,
        Commands::Pause => session::pause(&mut out, &mut engine)?,
        Commands::Toggle => session::toggle(&mut out, &mut engine)?,
        Commands::Reset => session::reset(&mut out, &mut engine)?,
        Commands::People { count } => session::people(&mut out, &mut engine, *count)?,
        Commands::Join { count } => session::adjust(&mut out, &mut engine, i64::from(*count))?,
        Commands::Leave { count } => session::adjust(&mut out, &mut engine, -i64::from(*count))?,
        Commands::Rate { amount, currency } => {
            session::rate(&mut out, &mut engine, *amount, *currency)?;
        }
        Commands::Currency { code } => session::currency(&mut out, &mut engine, *code)?,
        Commands::Language { code } => session::language(&mut out, &mut engine, *code)?,
        Commands::Status { json } => status::run(&mut out, &mut engine, *json)?,
        Commands::Share => share::run(&mut out, &engine, config.share_base_url.as_deref())?,
        Commands::Open { link } => share::open(&mut out, &mut engine, link)?,
        Commands::Watch { start } => {
            let input = watch::spawn_stdin_reader();
            watch::run(&mut out, &mut engine, *start, &input)?;
        }
    }

    commands::finish(&mut out, &mut engine)?;
    out.flush().context("failed to flush output")?;
    Ok(())
}
