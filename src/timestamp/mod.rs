// src/timestamp/mod.rs
//! Timestamp normalization for the sighting edit form.
//!
//! Stored `timeStamp` values come in several shapes: canonical instants
//! written by the save path, the long human form the cards display, and
//! numeric day-first strings from older records. [`normalize`] recovers a
//! local wall-clock reading from any of them and renders it the way a
//! `datetime-local` control expects (`YYYY-MM-DDTHH:MM`). Anything it cannot
//! read yields `None`; the caller leaves the control blank.

pub mod patterns;

use chrono::{
    DateTime, Datelike, Local, NaiveDateTime, Offset, SecondsFormat, TimeDelta, TimeZone, Utc,
};
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use self::patterns::{Recovered, DIRECT, PATTERNS};

/// Output format of [`normalize`], as read by a `datetime-local` input.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// en-GB long form used on the sighting cards.
pub const DISPLAY_FORMAT: &str = "%-d %B %Y at %H:%M";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Please select a date and time!")]
    Missing,
    #[error("unrecognized date/time value: {0:?}")]
    Unparseable(String),
}

// The offset this many hours before a skipped reading is the pre-jump one.
const GAP_LOOKBACK_HOURS: i64 = 3;

/// Pin a wall reading to an instant in `tz`.
///
/// Ambiguous readings take the earlier offset. Readings skipped by a DST jump
/// are read with the offset in force before the jump, which moves them
/// forward by the length of the gap (`01:30` becomes `02:30`).
fn resolve_local<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Tz>> {
    if let Some(dt) = tz.from_local_datetime(naive).earliest() {
        return Some(dt);
    }
    let before = naive.checked_sub_signed(TimeDelta::hours(GAP_LOOKBACK_HOURS))?;
    let offset = tz.offset_from_local_datetime(&before).earliest()?.fix();
    let utc = naive.checked_sub_signed(TimeDelta::seconds(offset.local_minus_utc().into()))?;
    Some(tz.from_utc_datetime(&utc))
}

/// Map a recovered value onto the wall clock of `tz`.
fn to_wall<Tz: TimeZone>(recovered: Recovered, tz: &Tz) -> Option<NaiveDateTime> {
    let naive = match recovered {
        Recovered::Instant(dt) => dt.with_timezone(tz).naive_local(),
        Recovered::Wall(naive) => resolve_local(&naive, tz)?.naive_local(),
    };
    (0..=9999).contains(&naive.year()).then_some(naive)
}

/// Run the pattern table against `raw` and return the first valid reading.
pub fn recover_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<(&'static str, NaiveDateTime)> {
    PATTERNS.iter().find_map(|p| {
        let recovered = (p.recover)(raw)?;
        to_wall(recovered, tz).map(|naive| (p.name, naive))
    })
}

/// [`normalize`] against an explicit time zone.
pub fn normalize_in<Tz: TimeZone>(raw: Option<&str>, tz: &Tz) -> Option<String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;

    match recover_in(raw, tz) {
        Some((pattern, naive)) => {
            debug!(target: "timestamp", raw, pattern, parsed = %naive, "timestamp recovered");
            Some(naive.format(CANONICAL_FORMAT).to_string())
        }
        None => {
            counter!("timestamp_normalize_failures_total").increment(1);
            warn!(target: "timestamp", raw, "could not parse timestamp; leaving field empty");
            None
        }
    }
}

/// Normalize a stored or displayed timestamp into `YYYY-MM-DDTHH:MM` local time.
///
/// Null, blank and unrecognized inputs all yield `None`.
pub fn normalize(raw: Option<&str>) -> Option<String> {
    normalize_in(raw, &Local)
}

/// [`display`] against an explicit time zone.
pub fn display_in<Tz: TimeZone>(raw: Option<&str>, tz: &Tz) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    (DIRECT.recover)(raw.trim())
        .and_then(|recovered| to_wall(recovered, tz))
        .map(|naive| naive.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Card rendering of a timestamp: machine-readable values become
/// `21 December 2025 at 14:00`, anything else is shown as stored.
pub fn display(raw: Option<&str>) -> String {
    display_in(raw, &Local)
}

/// [`to_storage`] against an explicit time zone.
pub fn to_storage_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Result<String, TimestampError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TimestampError::Missing);
    }
    let unparseable = || TimestampError::Unparseable(value.to_string());
    let instant = match (DIRECT.recover)(value).ok_or_else(unparseable)? {
        Recovered::Instant(dt) => dt.with_timezone(&Utc),
        Recovered::Wall(naive) => resolve_local(&naive, tz)
            .ok_or_else(unparseable)?
            .with_timezone(&Utc),
    };
    Ok(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Convert the edit control's local value into the stored instant
/// (UTC RFC 3339 with milliseconds).
pub fn to_storage(value: &str) -> Result<String, TimestampError> {
    to_storage_in(value, &Local)
}
