// Timestamp cell parsing

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Accepted timestamp layout, after `/` date separators are normalised to `-`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout of the time-of-day overlay
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

/// Layout of the date overlay (before the label is added)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result of reading a timestamp cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTimestamp {
    /// Cell holds a valid `YYYY-MM-DD HH:MM:SS` value
    Parsed(NaiveDateTime),

    /// Cell is malformed, empty, or not text at all
    Unparsable,
}

impl ParsedTimestamp {
    /// Parse a timestamp, accepting either `/` or `-` as the date separator
    ///
    /// The year must be exactly four digits at the start of the text and
    /// leap seconds are rejected, both of which chrono would otherwise accept.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.replace('/', "-");
        if !has_four_digit_year(&normalized) {
            tracing::debug!(raw, "Timestamp year is not four digits, using current time");
            return Self::Unparsable;
        }

        match NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT) {
            Ok(parsed) if parsed.nanosecond() >= 1_000_000_000 => {
                tracing::debug!(raw, "Timestamp is a leap second, using current time");
                Self::Unparsable
            }
            Ok(parsed) => Self::Parsed(parsed),
            Err(e) => {
                tracing::debug!(raw, error = %e, "Timestamp not parsable, using current time");
                Self::Unparsable
            }
        }
    }

    /// Instant to render: the parsed value, or the clock's current time
    pub fn resolve<C: Clock + ?Sized>(self, clock: &C) -> NaiveDateTime {
        match self {
            Self::Parsed(parsed) => parsed,
            Self::Unparsable => clock.now(),
        }
    }
}

/// `YYYY-` prefix: no sign, no padding, no short or long years
fn has_four_digit_year(text: &str) -> bool {
    match text.as_bytes().get(..5) {
        Some([year @ .., b'-']) => year.iter().all(u8::is_ascii_digit),
        _ => false,
    }
}

/// Display fields derived from a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkTime {
    /// "HH:MM:SS"
    pub time_of_day: String,

    /// "YYYY-MM-DD"
    pub date: String,
}

impl WatermarkTime {
    pub fn from_instant(instant: NaiveDateTime) -> Self {
        Self {
            time_of_day: instant.format(TIME_OF_DAY_FORMAT).to_string(),
            date: instant.format(DATE_FORMAT).to_string(),
        }
    }

    pub fn resolve<C: Clock + ?Sized>(timestamp: ParsedTimestamp, clock: &C) -> Self {
        Self::from_instant(timestamp.resolve(clock))
    }
}
