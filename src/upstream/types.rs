use serde::{Deserialize, Serialize};

/// Order lifecycle statuses with their fixed upstream ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
  Open,
  FollowUp,
  Running,
  Pending,
  Done,
  Verified,
}

impl OrderStatus {
  pub fn id(self) -> u16 {
    match self {
      OrderStatus::Open => 10,
      OrderStatus::FollowUp => 11,
      OrderStatus::Running => 12,
      OrderStatus::Pending => 13,
      OrderStatus::Done => 15,
      OrderStatus::Verified => 30,
    }
  }

  pub fn from_id(id: u16) -> Option<Self> {
    match id {
      10 => Some(OrderStatus::Open),
      11 => Some(OrderStatus::FollowUp),
      12 => Some(OrderStatus::Running),
      13 => Some(OrderStatus::Pending),
      15 => Some(OrderStatus::Done),
      30 => Some(OrderStatus::Verified),
      _ => None,
    }
  }

  /// Key used by the summary endpoint for this status.
  pub fn summary_key(self) -> &'static str {
    match self {
      OrderStatus::Open => "open",
      OrderStatus::FollowUp => "follow_up",
      OrderStatus::Running => "running",
      OrderStatus::Pending => "pending",
      OrderStatus::Done => "done",
      OrderStatus::Verified => "verified",
    }
  }
}

/// Normalized service order as fetched from upstream.
///
/// `created_raw` stays as the upstream free-text timestamp; parsing happens
/// in the analytics layer so a malformed value degrades per order instead of
/// failing the fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
  pub id: String,
  pub number: String,
  pub created_raw: String,
  pub note: String,
  pub location: String,
  /// Cleaned technician identity: trailing pipe separators stripped,
  /// upper-cased. Multi-technician strings are kept whole.
  pub technician: String,
  pub status: String,
}

/// One status-change record from an order's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
  pub status: String,
  /// Local action time reported by the actor's device. Preferred.
  pub event_time_raw: String,
  /// Server-side record time, used when the local time is unusable.
  pub recorded_at_raw: String,
  pub actor: String,
}

/// Photo attachment reference for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRef {
  pub url: String,
  pub caption: String,
}

/// Per-status order counts from the cheap summary endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
  pub open: u64,
  pub follow_up: u64,
  pub running: u64,
  pub pending: u64,
  pub done: u64,
  pub verified: u64,
}

impl SummaryCounts {
  pub fn for_status(&self, status: OrderStatus) -> u64 {
    match status {
      OrderStatus::Open => self.open,
      OrderStatus::FollowUp => self.follow_up,
      OrderStatus::Running => self.running,
      OrderStatus::Pending => self.pending,
      OrderStatus::Done => self.done,
      OrderStatus::Verified => self.verified,
    }
  }
}
