//! Serde-deserializable types matching the order tracker's API responses.
//!
//! The upstream is loosely typed: fields come and go, and the payload may sit
//! under `result`, under `data`, or be the bare body. Everything defaults to
//! empty so a sparse record normalizes instead of failing the whole fetch.

use serde::Deserialize;
use serde_json::Value;

use super::types::{Order, PhotoRef, StatusEvent, SummaryCounts};

/// Pull the actual payload out of whichever envelope the upstream used.
///
/// Checks `result` first (skipping the boolean success flag some endpoints
/// put there), then `data`, then falls back to the body itself.
pub fn unwrap_envelope(body: Value) -> Value {
  if let Some(obj) = body.as_object() {
    if let Some(result) = obj.get("result") {
      if !result.is_boolean() && !result.is_null() {
        return result.clone();
      }
    }
    if let Some(data) = obj.get("data") {
      if !data.is_null() {
        return data.clone();
      }
    }
  }
  body
}

// ============================================================================
// Raw record types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RawOrder {
  #[serde(default, alias = "id")]
  pub order_id: String,
  #[serde(default, alias = "number")]
  pub order_no: String,
  #[serde(default, alias = "created_at")]
  pub created_date: String,
  #[serde(default, alias = "complaint")]
  pub note: String,
  #[serde(default, alias = "lokasi")]
  pub location: String,
  #[serde(default)]
  pub teknisi: String,
  #[serde(default, alias = "status_name")]
  pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawStatusEvent {
  #[serde(default, alias = "status_name")]
  pub status: String,
  /// Local action time from the technician's device.
  #[serde(default, alias = "tgl_action")]
  pub action_date: String,
  /// Server-side record time.
  #[serde(default, alias = "created_at")]
  pub created_date: String,
  #[serde(default, alias = "username")]
  pub user_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSummary {
  #[serde(default)]
  pub open: u64,
  #[serde(default)]
  pub follow_up: u64,
  #[serde(default)]
  pub running: u64,
  #[serde(default)]
  pub pending: u64,
  #[serde(default)]
  pub done: u64,
  #[serde(default)]
  pub verified: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPhoto {
  #[serde(default, alias = "url")]
  pub photo_url: String,
  #[serde(default, alias = "keterangan")]
  pub caption: String,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

/// Clean a technician label: strip the trailing pipe separator the upstream
/// appends, then upper-case so the string is usable as a map key.
pub fn clean_technician(raw: &str) -> String {
  raw.trim().trim_end_matches('|').trim().to_uppercase()
}

impl From<RawOrder> for Order {
  fn from(raw: RawOrder) -> Self {
    Order {
      id: raw.order_id,
      number: raw.order_no,
      created_raw: raw.created_date,
      note: raw.note,
      location: raw.location,
      technician: clean_technician(&raw.teknisi),
      status: raw.status.trim().to_uppercase(),
    }
  }
}

impl From<RawStatusEvent> for StatusEvent {
  fn from(raw: RawStatusEvent) -> Self {
    StatusEvent {
      status: raw.status.trim().to_uppercase(),
      event_time_raw: raw.action_date,
      recorded_at_raw: raw.created_date,
      actor: raw.user_name,
    }
  }
}

impl From<RawSummary> for SummaryCounts {
  fn from(raw: RawSummary) -> Self {
    SummaryCounts {
      open: raw.open,
      follow_up: raw.follow_up,
      running: raw.running,
      pending: raw.pending,
      done: raw.done,
      verified: raw.verified,
    }
  }
}

impl From<RawPhoto> for PhotoRef {
  fn from(raw: RawPhoto) -> Self {
    PhotoRef {
      url: raw.photo_url,
      caption: raw.caption,
    }
  }
}
