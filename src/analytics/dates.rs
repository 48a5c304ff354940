//! Parsing for the upstream's free-text timestamps.
//!
//! The order tracker emits at least two formats depending on which subsystem
//! wrote the field, so parsing walks an ordered list of matchers. Anything
//! unparsable yields `None`; a bad timestamp must never take down a fetch.

use chrono::NaiveDateTime;

/// Known upstream formats, tried in order. The two documented formats come
/// first; generic ISO-ish shapes are the fallback.
const FORMATS: &[&str] = &[
  // "25 Feb 26 - 15:04"
  "%d %b %y - %H:%M",
  // "Feb 25 2026 9:14PM"
  "%b %d %Y %I:%M%p",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M",
];

/// Parse an upstream timestamp, returning `None` when no matcher applies.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }

  FORMATS
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{NaiveDate, Timelike};

  #[test]
  fn parses_day_first_format() {
    let parsed = parse_timestamp("25 Feb 26 - 15:04").unwrap();
    assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2026, 2, 25).unwrap());
    assert_eq!((parsed.hour(), parsed.minute()), (15, 4));
  }

  #[test]
  fn parses_month_first_am_pm_format() {
    let parsed = parse_timestamp("Feb 25 2026 9:14PM").unwrap();
    assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2026, 2, 25).unwrap());
    assert_eq!((parsed.hour(), parsed.minute()), (21, 14));
  }

  #[test]
  fn parses_iso_fallbacks() {
    assert!(parse_timestamp("2026-01-01T00:00").is_some());
    assert!(parse_timestamp("2026-01-01 08:30:15").is_some());
  }

  #[test]
  fn garbage_and_empty_yield_none() {
    assert!(parse_timestamp("").is_none());
    assert!(parse_timestamp("   ").is_none());
    assert!(parse_timestamp("yesterday").is_none());
    assert!(parse_timestamp("32 Feb 26 - 10:00").is_none());
  }
}
