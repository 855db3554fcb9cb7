//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use mc_core::engine::{DEFAULT_SAVE_DEBOUNCE_MS, DEFAULT_TICK_INTERVAL_MS};
use mc_core::types::{DEFAULT_QUANTITY, DEFAULT_RATE};
use mc_core::{
    Currency, EngineOptions, Language, Quantity, ResumePolicy, SessionDefaults,
};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// What to do with a session that was running when last saved.
    pub resume_policy: ResumePolicy,
    /// Refresh period of `mcc watch`.
    pub tick_interval_ms: u64,
    /// Delay before an edit is written to the database.
    pub save_debounce_ms: u64,
    /// Participants in a new session.
    pub default_people: u32,
    /// Hourly rate per participant in a new session.
    pub default_rate: f64,
    /// Currency of a new session; detected from the locale when unset.
    pub default_currency: Option<Currency>,
    /// Language of a new session; detected from the locale when unset.
    pub default_language: Option<Language>,
    /// Base URL that `mcc share` appends its query to.
    pub share_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("mcc.db"),
            // Every CLI invocation reloads the session, so a running meeting
            // has to keep running between commands.
            resume_policy: ResumePolicy::AutoResume,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            default_people: DEFAULT_QUANTITY,
            default_rate: DEFAULT_RATE,
            default_currency: None,
            default_language: None,
            share_base_url: None,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(dirs_config_path().as_deref(), config_path).extract()
    }

    fn figment(config_dir: Option<&Path>, config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = config_dir {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (MCC_*)
        figment.merge(Env::prefixed("MCC_"))
    }

    /// Defaults for a fresh session, filling unset fields from `locale`.
    pub fn session_defaults_for(&self, locale: &str) -> SessionDefaults {
        let detected = SessionDefaults::for_locale(locale);
        SessionDefaults {
            quantity: Quantity::clamped(i64::from(self.default_people)),
            rate: mc_core::types::clamp_rate(self.default_rate),
            currency: self.default_currency.unwrap_or(detected.currency),
            language: self.default_language.unwrap_or(detected.language),
        }
    }

    /// Defaults for a fresh session using the process locale.
    pub fn session_defaults(&self) -> SessionDefaults {
        self.session_defaults_for(&detect_locale())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            defaults: self.session_defaults(),
            resume_policy: self.resume_policy,
            tick_interval_ms: self.tick_interval_ms,
            save_debounce_ms: self.save_debounce_ms,
            ..EngineOptions::default()
        }
    }
}

/// The process locale from `LC_ALL`, `LC_MESSAGES` or `LANG`, in that order.
fn detect_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
        .unwrap_or_default()
}

/// Returns the platform-specific config directory for mcc.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mcc"))
}

/// Returns the platform-specific data directory for mcc.
///
/// On Linux: `~/.local/share/mcc`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("mcc"))
}
