//! Human-readable messages for engine notifications.

use std::io::Write;

use mc_core::format::plural;
use mc_core::{Axis, Currency, Notification, format_currency, format_elapsed_verbose};

/// The message shown for `notification`, or `None` if it needs no mention.
pub fn notification(notification: &Notification, currency: Currency) -> Option<String> {
    let message = match *notification {
        Notification::Milestone(milestone) => match milestone.axis {
            Axis::Time => format!(
                "Milestone: {} elapsed",
                format_elapsed_verbose(milestone.value)
            ),
            Axis::Cost => format!(
                "Milestone: {} spent",
                format_currency(f64::from(milestone.value), currency)
            ),
        },
        Notification::SessionRestored { resumed: true, .. } => return None,
        Notification::SessionRestored { gap_secs, .. } => format!(
            "Session restored - timer was paused ({} passed while away)",
            format_elapsed_verbose(gap_secs)
        ),
        Notification::SharedSessionLoaded { clock_drift, .. } => {
            if clock_drift {
                "Shared session loaded! Its start time lies in the future, timer reset to zero"
                    .to_string()
            } else {
                "Shared session loaded!".to_string()
            }
        }
        Notification::ParticipantsJoined { count } => format!(
            "{count} {} the meeting",
            plural(count, "person joined", "persons joined")
        ),
        Notification::ParticipantsLeft { count } => format!(
            "{count} {} the meeting",
            plural(count, "person left", "persons left")
        ),
        Notification::DurationCapReached => {
            "Meeting reached the 24 hour limit, timer paused".to_string()
        }
        Notification::StorageUnavailable => {
            "Storage unavailable, changes will not be saved".to_string()
        }
    };
    Some(message)
}

/// Writes one line per notification worth showing.
pub fn write_notifications<W: Write>(
    writer: &mut W,
    notifications: &[Notification],
    currency: Currency,
) -> std::io::Result<()> {
    for message in notifications
        .iter()
        .filter_map(|n| notification(n, currency))
    {
        writeln!(writer, "{message}")?;
    }
    Ok(())
}
