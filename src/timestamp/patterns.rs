// src/timestamp/patterns.rs
//! Ordered table of timestamp encodings the normalizer understands.
//!
//! Each entry pairs a recognizer with a constructor; the table is evaluated
//! top to bottom and the first entry that yields a valid calendar value wins.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// What a pattern recovered from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovered {
    /// An absolute instant (the input carried an offset).
    Instant(DateTime<FixedOffset>),
    /// A wall-clock reading in the local calendar.
    Wall(NaiveDateTime),
}

pub struct Pattern {
    pub name: &'static str,
    pub recover: fn(&str) -> Option<Recovered>,
}

pub const DIRECT: Pattern = Pattern {
    name: "direct",
    recover: recover_direct,
};

pub const LONG_FORM: Pattern = Pattern {
    name: "long-form",
    recover: recover_long_form,
};

pub const NUMERIC: Pattern = Pattern {
    name: "numeric",
    recover: recover_numeric,
};

/// Evaluation order. Precedence is exactly the array order.
pub const PATTERNS: [Pattern; 3] = [DIRECT, LONG_FORM, NUMERIC];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Resolve a month name to its 0-based index (jan = 0 .. dec = 11).
///
/// Accepts full names and prefixes of at least three letters, case-insensitively
/// (`Dec`, `sept`, `DECEMBER`).
pub fn month_index(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    if name.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|full| full.starts_with(name.as_str()))
        .map(|i| i as u32)
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const NAIVE_SHORT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

// ISO 8601 with an offset but no seconds (`2025-12-21T14:00+01:00`).
const OFFSET_SHORT_FORMATS: [&str; 3] =
    ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%dT%H:%M%#z"];

/// Machine formats: RFC 3339, ISO 8601 with or without a zone, ISO date,
/// RFC 2822.
fn recover_direct(input: &str) -> Option<Recovered> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(Recovered::Instant(dt));
    }
    for fmt in OFFSET_SHORT_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, fmt) {
            return Some(Recovered::Instant(dt));
        }
    }
    if let Some(utc) = input.strip_suffix(['Z', 'z']) {
        for fmt in NAIVE_FORMATS.iter().chain(NAIVE_SHORT_FORMATS.iter()) {
            if let Ok(naive) = NaiveDateTime::parse_from_str(utc, fmt) {
                return Some(Recovered::Instant(naive.and_utc().fixed_offset()));
            }
        }
    }
    for fmt in NAIVE_FORMATS.iter().chain(NAIVE_SHORT_FORMATS.iter()) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(Recovered::Wall(naive));
        }
    }
    // A bare ISO date is a UTC midnight, as browsers read it.
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let utc = date.and_hms_opt(0, 0, 0)?.and_utc();
        return Some(Recovered::Instant(utc.fixed_offset()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(Recovered::Instant(dt));
    }
    None
}

static RE_LONG_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b([0-9]{1,2})\s+([a-z]+)\s+([0-9]{4})(?:,|\s+at\s+)?\s*([0-9]{1,2}):([0-9]{2})\b",
    )
    .expect("long-form timestamp regex")
});

static RE_NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([0-9]{1,2})[/-]([0-9]{1,2})[/-]([0-9]{4}|[0-9]{2})[, ]+([0-9]{1,2}):([0-9]{2})\b")
        .expect("numeric timestamp regex")
});

fn num(caps: &Captures<'_>, i: usize) -> Option<u32> {
    caps.get(i)?.as_str().parse().ok()
}

fn wall(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<Recovered> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(Recovered::Wall(date.and_hms_opt(hour, minute, 0)?))
}

/// `21 December 2025, 14:00`, `7 Jan 2025 at 10:00`.
fn recover_long_form(input: &str) -> Option<Recovered> {
    let caps = RE_LONG_FORM.captures(input)?;
    let month = month_index(caps.get(2)?.as_str())?;
    wall(
        num(&caps, 3)? as i32,
        month + 1,
        num(&caps, 1)?,
        num(&caps, 4)?,
        num(&caps, 5)?,
    )
}

/// `21/12/2025, 14:00`, `21-12-25 14:00`. Always day-first.
fn recover_numeric(input: &str) -> Option<Recovered> {
    let caps = RE_NUMERIC.captures(input)?;
    let raw_year = caps.get(3)?.as_str();
    let mut year: i32 = raw_year.parse().ok()?;
    if raw_year.len() == 2 {
        year += 2000;
    }
    wall(
        year,
        num(&caps, 2)?,
        num(&caps, 1)?,
        num(&caps, 4)?,
        num(&caps, 5)?,
    )
}
