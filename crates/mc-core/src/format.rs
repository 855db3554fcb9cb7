//! Display formatting for amounts, durations and the participant history.
//!
//! Wording is English; translated strings belong to the host.

use crate::ledger::Segment;
use crate::types::{Currency, SymbolPosition};

/// Formats `amount` with the currency's symbol, grouping and decimals.
///
/// ```
/// use mc_core::{Currency, format_currency};
///
/// assert_eq!(format_currency(1234.5, Currency::Eur), "1.234,50 €");
/// assert_eq!(format_currency(1234.5, Currency::Usd), "$ 1,234.50");
/// ```
pub fn format_currency(amount: f64, currency: Currency) -> String {
    let format = currency.format();
    let amount = if amount.is_finite() { amount } else { 0.0 };

    let rounded = format!("{:.*}", format.decimals, amount.abs());
    let (integer, fraction) = rounded
        .split_once('.')
        .map_or((rounded.as_str(), None), |(i, f)| (i, Some(f)));

    let mut body = group_thousands(integer, format.thousands_separator);
    if let Some(fraction) = fraction.filter(|_| format.decimals > 0) {
        body.push_str(format.decimal_separator);
        body.push_str(fraction);
    }
    if amount < 0.0 && rounded.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        body.insert(0, '-');
    }

    match format.position {
        SymbolPosition::Prefix => format!("{} {body}", format.symbol),
        SymbolPosition::Suffix => format!("{body} {}", format.symbol),
    }
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// Compact elapsed time: `45s`, `2m 5s`, `1h 0m 12s`.
pub fn format_elapsed(secs: u32) -> String {
    let (hours, minutes, seconds) = split(secs);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Spelled-out elapsed time: `1 hour 2 minutes`, `5 minutes 1 second`.
///
/// Seconds are dropped once the duration reaches an hour.
pub fn format_elapsed_verbose(secs: u32) -> String {
    let (hours, minutes, seconds) = split(secs);
    if hours > 0 {
        format!(
            "{hours} {} {minutes} {}",
            plural(hours, "hour", "hours"),
            plural(minutes, "minute", "minutes")
        )
    } else if minutes > 0 {
        format!(
            "{minutes} {} {seconds} {}",
            plural(minutes, "minute", "minutes"),
            plural(seconds, "second", "seconds")
        )
    } else {
        format!("{seconds} {}", plural(seconds, "second", "seconds"))
    }
}

/// One line of the participant history. The first segment reads as the
/// meeting start.
pub fn format_history_entry(segment: &Segment, index: usize) -> String {
    let quantity = segment.quantity.value();
    let persons = plural(quantity, "person", "persons");
    if index == 0 {
        format!("Start: {quantity} {persons}")
    } else {
        format!(
            "{}: {quantity} {persons}",
            format_elapsed_verbose(segment.start_time)
        )
    }
}

/// Picks the singular or plural word for `n`.
pub const fn plural(n: u32, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 { one } else { many }
}

const fn split(secs: u32) -> (u32, u32, u32) {
    (secs / 3600, secs % 3600 / 60, secs % 60)
}
