//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mc_core::{Currency, Language};

/// Meeting cost calculator.
///
/// Tracks how much a meeting costs while it runs, from the number of people
/// in the room and their hourly rate.
#[derive(Debug, Parser)]
#[command(name = "mcc", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the meeting clock.
    Start,

    /// Pause the meeting clock.
    Pause,

    /// Start the clock if paused, pause it if running.
    Toggle,

    /// Zero the meeting, keeping participants and rate.
    Reset,

    /// Set the number of participants.
    People {
        /// Participant count (1 to 999).
        count: u32,
    },

    /// Add participants.
    Join {
        /// How many people joined.
        #[arg(default_value_t = 1)]
        count: u32,
    },

    /// Remove participants.
    Leave {
        /// How many people left.
        #[arg(default_value_t = 1)]
        count: u32,
    },

    /// Set the hourly cost per participant.
    Rate {
        /// Amount per person per hour (0 to 9999).
        amount: f64,

        /// Also switch the display currency.
        #[arg(long)]
        currency: Option<Currency>,
    },

    /// Set the display currency.
    Currency {
        /// ISO code, e.g. EUR or USD.
        code: Currency,
    },

    /// Set the session language carried in share links.
    Language {
        /// One of de, en, es, fr, it, pl.
        code: Language,
    },

    /// Show the current meeting.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a link that reproduces the current meeting.
    Share,

    /// Load a meeting from a share link.
    Open {
        /// Full URL or bare query string.
        link: String,
    },

    /// Follow the meeting live, with keyboard controls.
    Watch {
        /// Start the clock when the watch begins.
        #[arg(long)]
        start: bool,
    },
}
