//! Resolves how long an order took from actionable follow-up to resolution.

use chrono::NaiveDateTime;

use crate::upstream::types::{Order, StatusEvent};

use super::dates::parse_timestamp;

const START_STATUS: &str = "FOLLOW UP";
const END_STATUSES: [&str; 2] = ["DONE", "VERIFIED"];

/// Resolved follow-up window for one order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDuration {
  pub start_at: NaiveDateTime,
  pub end_at: NaiveDateTime,
  pub hours: f64,
}

/// Best-effort timestamp for a history event: the local action time wins,
/// the server record time is the fallback.
fn event_time(event: &StatusEvent) -> Option<NaiveDateTime> {
  parse_timestamp(&event.event_time_raw).or_else(|| parse_timestamp(&event.recorded_at_raw))
}

/// Compute the elapsed time between the first FOLLOW UP event and the last
/// DONE/VERIFIED event.
///
/// Events without any parsable timestamp are ignored. When no qualifying end
/// event exists the chronologically last event stands in, and failing that
/// the order's own creation time. An order with no FOLLOW UP event returns
/// `None` and is excluded from aggregation: responsiveness is only measured
/// from the moment an order became actionable.
///
/// Negative spans (clock skew between devices and the server) clamp to zero
/// rather than being dropped.
pub fn resolve(order: &Order, events: &[StatusEvent]) -> Option<ResolvedDuration> {
  let mut timed: Vec<(NaiveDateTime, &StatusEvent)> = events
    .iter()
    .filter_map(|event| event_time(event).map(|at| (at, event)))
    .collect();
  timed.sort_by_key(|(at, _)| *at);

  let start_at = timed
    .iter()
    .find(|(_, event)| normalized(&event.status) == START_STATUS)
    .map(|(at, _)| *at)?;

  let end_at = timed
    .iter()
    .rev()
    .find(|(_, event)| END_STATUSES.contains(&normalized(&event.status).as_str()))
    .map(|(at, _)| *at)
    .or_else(|| timed.last().map(|(at, _)| *at))
    .or_else(|| parse_timestamp(&order.created_raw))?;

  let hours = ((end_at - start_at).num_seconds() as f64 / 3600.0).max(0.0);

  Some(ResolvedDuration {
    start_at,
    end_at,
    hours,
  })
}

fn normalized(status: &str) -> String {
  status.trim().to_uppercase()
}
