//! Core type definitions with validation.
//!
//! Numeric inputs are never rejected: they are clamped into range at every
//! boundary (direct updates, storage restore, share links). Only unknown
//! currency or language codes produce a [`ValidationError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on tracked meeting time (24 hours).
pub const MAX_ELAPSED_SECS: u32 = 86_400;

/// Smallest participant count.
pub const MIN_QUANTITY: u32 = 1;

/// Largest participant count.
pub const MAX_QUANTITY: u32 = 999;

/// Largest hourly rate per participant.
pub const MAX_RATE: f64 = 9_999.0;

/// Earliest wall-clock timestamp accepted from a share link (2000-01-01).
pub const MIN_TIMESTAMP_MS: i64 = 946_684_800_000;

/// Latest wall-clock timestamp accepted from a share link (2100-01-01).
pub const MAX_TIMESTAMP_MS: i64 = 4_102_444_800_000;

/// Participant count for a brand new session.
pub const DEFAULT_QUANTITY: u32 = 2;

/// Hourly rate for a brand new session.
pub const DEFAULT_RATE: f64 = 65.0;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The currency code is not one we know how to format.
    #[error("unknown currency code: {value}")]
    UnknownCurrency { value: String },

    /// The language code is not supported.
    #[error("unsupported language: {value}")]
    UnknownLanguage { value: String },
}

/// Clamps a raw elapsed-seconds value into `[0, MAX_ELAPSED_SECS]`.
#[must_use]
pub fn clamp_elapsed(secs: i64) -> u32 {
    u32::try_from(secs.clamp(0, i64::from(MAX_ELAPSED_SECS))).unwrap_or(MAX_ELAPSED_SECS)
}

/// Clamps a floating point elapsed value, treating NaN as zero.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "value is floored and clamped to the elapsed cap first"
)]
pub fn clamp_elapsed_f64(secs: f64) -> u32 {
    if secs.is_nan() {
        return 0;
    }
    clamp_elapsed(secs.floor().clamp(0.0, f64::from(MAX_ELAPSED_SECS)) as i64)
}

/// Returns true if the timestamp lies in the range accepted from share links.
#[must_use]
pub fn is_valid_timestamp(ms: i64) -> bool {
    (MIN_TIMESTAMP_MS..=MAX_TIMESTAMP_MS).contains(&ms)
}

/// Number of participants in a segment, always within \[1, 999\].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(u32);

impl Quantity {
    /// Creates a quantity, clamping to \[1, 999\].
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let clamped = value.clamp(i64::from(MIN_QUANTITY), i64::from(MAX_QUANTITY));
        Self(u32::try_from(clamped).unwrap_or(MIN_QUANTITY))
    }

    /// Creates a quantity from a float, truncating toward zero. NaN becomes 1.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "value is clamped to the quantity range first"
    )]
    pub fn clamped_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self(MIN_QUANTITY);
        }
        let clamped = value.clamp(f64::from(MIN_QUANTITY), f64::from(MAX_QUANTITY));
        Self::clamped(clamped.trunc() as i64)
    }

    /// Returns the inner count.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self(DEFAULT_QUANTITY)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Quantity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        // Clamp on deserialization to be lenient with external data
        Ok(Self::clamped_f64(value))
    }
}

/// Clamps an hourly rate into `[0, MAX_RATE]`. Non-finite input becomes 0.
#[must_use]
pub fn clamp_rate(amount: f64) -> f64 {
    if !amount.is_finite() {
        return 0.0;
    }
    amount.clamp(0.0, MAX_RATE)
}

/// Hourly cost per participant together with its display currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    amount_per_unit_per_hour: f64,
    currency: Currency,
}

impl Rate {
    /// Creates a rate, clamping the amount to \[0, 9999\].
    #[must_use]
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount_per_unit_per_hour: clamp_rate(amount),
            currency,
        }
    }

    /// Hourly amount per participant.
    #[must_use]
    pub const fn amount(&self) -> f64 {
        self.amount_per_unit_per_hour
    }

    #[must_use]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Replaces the amount, clamping as in [`Rate::new`].
    pub fn set_amount(&mut self, amount: f64) {
        self.amount_per_unit_per_hour = clamp_rate(amount);
    }

    pub const fn set_currency(&mut self, currency: Currency) {
        self.currency = currency;
    }
}

/// Where the currency symbol goes relative to the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPosition {
    Prefix,
    Suffix,
}

/// Display rules for one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyFormat {
    pub symbol: &'static str,
    pub decimals: usize,
    pub position: SymbolPosition,
    pub decimal_separator: &'static str,
    pub thousands_separator: &'static str,
}

/// Supported display currencies.
///
/// Amounts are never converted between currencies; the code only selects
/// how the running cost is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
    Jpy,
    Cny,
    Inr,
    Aud,
    Cad,
    Brl,
}

impl Currency {
    /// All supported currencies.
    pub const ALL: [Self; 10] = [
        Self::Eur,
        Self::Usd,
        Self::Gbp,
        Self::Chf,
        Self::Jpy,
        Self::Cny,
        Self::Inr,
        Self::Aud,
        Self::Cad,
        Self::Brl,
    ];

    /// ISO 4217 code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Chf => "CHF",
            Self::Jpy => "JPY",
            Self::Cny => "CNY",
            Self::Inr => "INR",
            Self::Aud => "AUD",
            Self::Cad => "CAD",
            Self::Brl => "BRL",
        }
    }

    /// Formatting rules for amounts in this currency.
    #[must_use]
    pub const fn format(&self) -> CurrencyFormat {
        const fn prefix(symbol: &'static str) -> CurrencyFormat {
            CurrencyFormat {
                symbol,
                decimals: 2,
                position: SymbolPosition::Prefix,
                decimal_separator: ".",
                thousands_separator: ",",
            }
        }

        match self {
            Self::Eur => CurrencyFormat {
                symbol: "€",
                decimals: 2,
                position: SymbolPosition::Suffix,
                decimal_separator: ",",
                thousands_separator: ".",
            },
            Self::Chf => CurrencyFormat {
                symbol: "CHF",
                decimals: 2,
                position: SymbolPosition::Suffix,
                decimal_separator: ".",
                thousands_separator: "'",
            },
            Self::Jpy => CurrencyFormat {
                decimals: 0,
                decimal_separator: "",
                ..prefix("¥")
            },
            Self::Brl => CurrencyFormat {
                decimal_separator: ",",
                thousands_separator: ".",
                ..prefix("R$")
            },
            Self::Usd => prefix("$"),
            Self::Gbp => prefix("£"),
            Self::Cny => prefix("¥"),
            Self::Inr => prefix("₹"),
            Self::Aud => prefix("A$"),
            Self::Cad => prefix("C$"),
        }
    }

    /// Picks a currency for a locale tag such as `de-CH` or `en_GB.UTF-8`.
    ///
    /// Tries the full tag first, then the primary language subtag, and falls
    /// back to EUR.
    #[must_use]
    pub fn for_locale(tag: &str) -> Self {
        let tag = normalize_locale(tag);
        let exact = match tag.as_str() {
            "de-CH" | "fr-CH" | "it-CH" => Some(Self::Chf),
            "en-US" | "es-MX" | "es-AR" => Some(Self::Usd),
            "en-GB" => Some(Self::Gbp),
            "en-AU" => Some(Self::Aud),
            "en-CA" | "fr-CA" => Some(Self::Cad),
            "en-IN" => Some(Self::Inr),
            "pt-BR" => Some(Self::Brl),
            _ => None,
        };
        if let Some(currency) = exact {
            return currency;
        }

        match primary_subtag(&tag) {
            "en" => Self::Usd,
            "ja" => Self::Jpy,
            "zh" => Self::Cny,
            _ => Self::Eur,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownCurrency {
                value: s.to_string(),
            })
    }
}

/// Interface languages carried through share links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    #[default]
    En,
    Es,
    Fr,
    It,
    Pl,
}

impl Language {
    pub const ALL: [Self; 6] = [Self::De, Self::En, Self::Es, Self::Fr, Self::It, Self::Pl];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::De => "de",
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::It => "it",
            Self::Pl => "pl",
        }
    }

    /// Picks a language from a locale tag, falling back to English.
    #[must_use]
    pub fn for_locale(tag: &str) -> Self {
        let tag = normalize_locale(tag);
        primary_subtag(&tag).parse().unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownLanguage {
                value: s.to_string(),
            })
    }
}

/// Turns POSIX-style locales (`en_GB.UTF-8`) into BCP 47-style tags (`en-GB`).
fn normalize_locale(tag: &str) -> String {
    let tag = tag.split(['.', '@']).next().unwrap_or_default();
    tag.trim().replace('_', "-")
}

fn primary_subtag(tag: &str) -> &str {
    tag.split('-').next().unwrap_or_default()
}
