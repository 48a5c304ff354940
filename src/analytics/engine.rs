//! Aggregation of resolved order durations into calendar buckets.

use chrono::Datelike;
use futures::StreamExt;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::upstream::cached_client::CachedOrderClient;
use crate::upstream::client::Transport;
use crate::upstream::types::{Order, OrderStatus};

use super::dates::parse_timestamp;
use super::duration::{self, ResolvedDuration};
use super::period::{bucket_key, bucket_label, Granularity};
use super::snapshot::{self, SnapshotEntry};

/// Cap on in-flight history fetches per run, to respect upstream limits.
const HISTORY_FETCH_CONCURRENCY: usize = 10;

const DETAIL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone)]
pub struct AggregateParams {
  pub statuses: Vec<OrderStatus>,
  pub granularity: Granularity,
  pub month: Option<u32>,
  pub year: Option<i32>,
  /// Re-fetch everything from upstream instead of reading the persisted
  /// snapshot.
  pub recalculate: bool,
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
  pub success: bool,
  pub data: Vec<PeriodBucket>,
  /// Every technician seen in the data set, ignoring the date filter, so a
  /// consumer can populate filter widgets.
  pub technicians: Vec<String>,
  #[serde(rename = "viewType")]
  pub view_type: String,
}

#[derive(Debug, Serialize)]
pub struct PeriodBucket {
  #[serde(rename = "rawKey")]
  pub raw_key: String,
  pub label: String,
  #[serde(rename = "averageHours")]
  pub average_hours: f64,
  #[serde(rename = "orderCount")]
  pub order_count: u64,
  /// Sorted ascending by average hours, fastest first.
  pub technicians: Vec<TechnicianStats>,
  /// Sorted descending by duration, slowest first.
  pub details: Vec<OrderDetail>,
}

#[derive(Debug, Serialize)]
pub struct TechnicianStats {
  pub name: String,
  #[serde(rename = "averageHours")]
  pub average_hours: f64,
  #[serde(rename = "orderCount")]
  pub order_count: u64,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
  pub order_no: String,
  pub title: String,
  pub follow_up_date: String,
  pub done_date: String,
  pub duration_hours: f64,
  pub teknisi: String,
}

// ============================================================================
// Engine
// ============================================================================

pub struct AggregationEngine<T: Transport> {
  client: CachedOrderClient<T>,
  snapshot_path: PathBuf,
}

impl<T: Transport> AggregationEngine<T> {
  pub fn new(client: CachedOrderClient<T>, snapshot_path: PathBuf) -> Self {
    Self {
      client,
      snapshot_path,
    }
  }

  /// Run one aggregation: fetch (or reload) the order/history pairs, then
  /// bucket and roll them up.
  pub async fn aggregate(&self, params: &AggregateParams) -> ApiResult<AnalysisResponse> {
    let persisted = if params.recalculate {
      None
    } else {
      snapshot::load(&self.snapshot_path)
    };

    let entries = match persisted {
      Some(entries) => {
        info!(entries = entries.len(), "using persisted recalculation snapshot");
        entries
      }
      None => {
        let entries = self.fetch_all(&params.statuses).await?;
        if let Err(err) = snapshot::store(&self.snapshot_path, &entries) {
          warn!(%err, "could not persist recalculation snapshot");
        }
        entries
      }
    };

    Ok(build_response(&entries, params))
  }

  /// Fetch every requested status list plus per-order histories.
  ///
  /// The summary call doubles as the abort gate: if the session or the
  /// summary endpoint is down there is nothing to aggregate. After that,
  /// a failing status list contributes zero orders and a failing history
  /// excludes only its order.
  async fn fetch_all(&self, statuses: &[OrderStatus]) -> ApiResult<Vec<SnapshotEntry>> {
    self.client.ensure_summary().await?;

    let mut orders: Vec<Order> = Vec::new();
    for &status in statuses {
      match self.client.orders_by_status(status).await {
        Ok(batch) => {
          info!(status = status.summary_key(), count = batch.len(), "fetched status list");
          orders.extend(batch);
        }
        Err(err) => {
          warn!(status = status.summary_key(), %err, "status list fetch failed, skipping");
        }
      }
    }

    let client = self.client.clone();
    let entries: Vec<SnapshotEntry> = futures::stream::iter(orders.into_iter().map(move |order| {
      let client = client.clone();
      async move {
        match client.order_history(&order.id).await {
          Ok(history) => Some(SnapshotEntry { order, history }),
          Err(err) => {
            warn!(order = %order.number, %err, "history fetch failed, excluding order");
            None
          }
        }
      }
    }))
    .buffered(HISTORY_FETCH_CONCURRENCY)
    .filter_map(|entry| async move { entry })
    .collect()
    .await;

    Ok(entries)
  }
}

// ============================================================================
// Pure aggregation over fetched pairs
// ============================================================================

/// Bucket and roll up a set of order/history pairs. Deterministic: the same
/// input yields byte-identical JSON.
pub fn build_response(entries: &[SnapshotEntry], params: &AggregateParams) -> AnalysisResponse {
  // Technician names for filter population come from the unfiltered set.
  let mut technicians: BTreeSet<String> = BTreeSet::new();
  for entry in entries {
    if !entry.order.technician.is_empty() {
      technicians.insert(entry.order.technician.clone());
    }
  }

  let mut buckets: BTreeMap<String, BucketAccum> = BTreeMap::new();

  for entry in entries {
    if !matches_filter(&entry.order, params.month, params.year) {
      continue;
    }
    let Some(resolved) = duration::resolve(&entry.order, &entry.history) else {
      continue;
    };

    let date = resolved.start_at.date();
    let key = bucket_key(date, params.granularity);
    buckets
      .entry(key)
      .or_insert_with(|| BucketAccum::new(bucket_label(date, params.granularity)))
      .add(&entry.order, &resolved);
  }

  AnalysisResponse {
    success: true,
    data: buckets
      .into_iter()
      .map(|(key, accum)| accum.finish(key))
      .collect(),
    technicians: technicians.into_iter().collect(),
    view_type: params.granularity.as_str().to_string(),
  }
}

/// Month/year filter applied to the order's own creation timestamp. With a
/// filter active, an unparsable creation date cannot match.
fn matches_filter(order: &Order, month: Option<u32>, year: Option<i32>) -> bool {
  if month.is_none() && year.is_none() {
    return true;
  }
  let Some(created) = parse_timestamp(&order.created_raw) else {
    return false;
  };
  if let Some(month) = month {
    if created.month() != month {
      return false;
    }
  }
  if let Some(year) = year {
    if created.year() != year {
      return false;
    }
  }
  true
}

fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

#[derive(Default)]
struct TechAccum {
  total_hours: f64,
  order_count: u64,
}

struct BucketAccum {
  label: String,
  total_hours: f64,
  order_count: u64,
  technicians: BTreeMap<String, TechAccum>,
  details: Vec<OrderDetail>,
}

impl BucketAccum {
  fn new(label: String) -> Self {
    Self {
      label,
      total_hours: 0.0,
      order_count: 0,
      technicians: BTreeMap::new(),
      details: Vec::new(),
    }
  }

  fn add(&mut self, order: &Order, resolved: &ResolvedDuration) {
    self.total_hours += resolved.hours;
    self.order_count += 1;

    self.details.push(OrderDetail {
      order_no: order.number.clone(),
      title: order.note.clone(),
      follow_up_date: resolved.start_at.format(DETAIL_DATE_FORMAT).to_string(),
      done_date: resolved.end_at.format(DETAIL_DATE_FORMAT).to_string(),
      duration_hours: round2(resolved.hours),
      teknisi: order.technician.clone(),
    });

    if !order.technician.is_empty() {
      let tech = self.technicians.entry(order.technician.clone()).or_default();
      tech.total_hours += resolved.hours;
      tech.order_count += 1;
    }
  }

  fn finish(self, key: String) -> PeriodBucket {
    let mut technicians: Vec<TechnicianStats> = self
      .technicians
      .into_iter()
      .map(|(name, tech)| TechnicianStats {
        name,
        average_hours: round2(tech.total_hours / tech.order_count as f64),
        order_count: tech.order_count,
      })
      .collect();
    // Fastest first; names from the BTreeMap keep ties deterministic.
    technicians.sort_by(|a, b| {
      a.average_hours
        .partial_cmp(&b.average_hours)
        .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut details = self.details;
    details.sort_by(|a, b| {
      b.duration_hours
        .partial_cmp(&a.duration_hours)
        .unwrap_or(std::cmp::Ordering::Equal)
    });

    PeriodBucket {
      average_hours: round2(self.total_hours / self.order_count as f64),
      raw_key: key,
      label: self.label,
      order_count: self.order_count,
      technicians,
      details,
    }
  }
}
