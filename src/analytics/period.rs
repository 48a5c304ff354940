//! Calendar bucketing for the analytics views.
//!
//! Bucket keys are pure functions of (date, granularity) so re-running an
//! aggregation over the same data always lands in the same buckets. Weeks
//! use ISO numbering: week 1 holds the year's first Thursday, weeks start on
//! Monday.

use chrono::{Datelike, Days, NaiveDate};

const MONTHS: [&str; 12] = [
  "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Granularity {
  Daily,
  Weekly,
  Monthly,
}

impl Granularity {
  pub fn as_str(self) -> &'static str {
    match self {
      Granularity::Daily => "daily",
      Granularity::Weekly => "weekly",
      Granularity::Monthly => "monthly",
    }
  }
}

fn month_abbrev(date: NaiveDate) -> &'static str {
  MONTHS[date.month0() as usize]
}

/// Monday of the ISO week containing `date`.
fn iso_week_monday(date: NaiveDate) -> NaiveDate {
  let back = date.weekday().num_days_from_monday() as u64;
  date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// Stable sort/grouping key for the bucket containing `date`.
pub fn bucket_key(date: NaiveDate, granularity: Granularity) -> String {
  match granularity {
    Granularity::Daily => date.format("%Y-%m-%d").to_string(),
    Granularity::Monthly => date.format("%Y-%m").to_string(),
    Granularity::Weekly => {
      let week = date.iso_week();
      format!("{}-W{:02}", week.year(), week.week())
    }
  }
}

/// Human-readable label for the bucket containing `date`.
pub fn bucket_label(date: NaiveDate, granularity: Granularity) -> String {
  match granularity {
    Granularity::Daily => format!("{:02} {}", date.day(), month_abbrev(date)),
    Granularity::Monthly => format!("{} {}", month_abbrev(date), date.year()),
    Granularity::Weekly => {
      let monday = iso_week_monday(date);
      let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
      if monday.year() == sunday.year() {
        format!(
          "{} {} - {} {} ({})",
          monday.day(),
          month_abbrev(monday),
          sunday.day(),
          month_abbrev(sunday),
          monday.year()
        )
      } else {
        // The week straddles a year boundary: both endpoints carry their
        // own year.
        format!(
          "{} {} {} - {} {} {}",
          monday.day(),
          month_abbrev(monday),
          monday.year(),
          sunday.day(),
          month_abbrev(sunday),
          sunday.year()
        )
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn daily_key_and_label() {
    assert_eq!(bucket_key(d(2026, 2, 5), Granularity::Daily), "2026-02-05");
    assert_eq!(bucket_label(d(2026, 2, 5), Granularity::Daily), "05 Feb");
  }

  #[test]
  fn monthly_key_and_label() {
    assert_eq!(bucket_key(d(2026, 11, 30), Granularity::Monthly), "2026-11");
    assert_eq!(bucket_label(d(2026, 11, 30), Granularity::Monthly), "Nov 2026");
  }

  #[test]
  fn weekly_key_uses_iso_week() {
    // First Thursday of 2026 is Jan 1, so that week is 2026-W01.
    assert_eq!(bucket_key(d(2026, 1, 1), Granularity::Weekly), "2026-W01");
  }

  #[test]
  fn year_boundary_dates_share_a_week() {
    // Dec 31 2025 (Wed) and Jan 1 2026 (Thu) sit in the same ISO week.
    let before = bucket_key(d(2025, 12, 31), Granularity::Weekly);
    let after = bucket_key(d(2026, 1, 1), Granularity::Weekly);
    assert_eq!(before, "2026-W01");
    assert_eq!(before, after);
  }

  #[test]
  fn weekly_label_spans_monday_to_sunday() {
    // 2026-W01 runs Mon Dec 29 2025 .. Sun Jan 4 2026.
    let label = bucket_label(d(2026, 1, 1), Granularity::Weekly);
    assert_eq!(label, "29 Dec 2025 - 4 Jan 2026");
  }

  #[test]
  fn weekly_label_within_one_year() {
    // 2026-03-04 is a Wednesday; its week is Mon Mar 2 .. Sun Mar 8.
    let label = bucket_label(d(2026, 3, 4), Granularity::Weekly);
    assert_eq!(label, "2 Mar - 8 Mar (2026)");
  }

  #[test]
  fn weekly_label_across_month_boundary() {
    // Week of Mon Mar 30 .. Sun Apr 5 2026.
    let label = bucket_label(d(2026, 4, 1), Granularity::Weekly);
    assert_eq!(label, "30 Mar - 5 Apr (2026)");
  }

  #[test]
  fn keys_are_deterministic_in_leap_years() {
    let date = d(2028, 2, 29);
    for granularity in [Granularity::Daily, Granularity::Weekly, Granularity::Monthly] {
      assert_eq!(bucket_key(date, granularity), bucket_key(date, granularity));
    }
  }
}
