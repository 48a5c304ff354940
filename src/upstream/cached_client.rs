//! Freshness-gated order fetching.
//!
//! Every access pays for a cheap summary call (reused for a few seconds) and
//! only hits the full list endpoint when the summary count for that status
//! has changed since the cached list was populated. The read/compare/decide
//! sequence is one logical step per status; concurrent callers may still
//! each decide to re-fetch the same list, there is no single-flight dedup.

use std::sync::Arc;
use tracing::debug;

use crate::cache::{OrderCache, StatusListEntry};
use crate::error::ApiResult;

use super::client::{RetryingClient, Transport};
use super::types::{Order, OrderStatus, PhotoRef, StatusEvent, SummaryCounts};

pub struct CachedOrderClient<T: Transport> {
  inner: RetryingClient<T>,
  cache: Arc<OrderCache>,
}

impl<T: Transport> Clone for CachedOrderClient<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      cache: Arc::clone(&self.cache),
    }
  }
}

impl<T: Transport> CachedOrderClient<T> {
  pub fn new(inner: RetryingClient<T>, cache: Arc<OrderCache>) -> Self {
    Self { inner, cache }
  }

  /// Fetch the order list for one status, skipping the list endpoint when
  /// the summary says nothing changed.
  ///
  /// A summary failure propagates: without a trustworthy summary the gate
  /// cannot decide anything.
  pub async fn orders_by_status(&self, status: OrderStatus) -> ApiResult<Vec<Order>> {
    let counts = self.fresh_summary().await?;
    let current = counts.for_status(status);
    let key = status.summary_key();

    if let Some(entry) = self.cache.status_list(key) {
      if entry.summary_count == current {
        debug!(status = key, count = current, "summary unchanged, serving cached list");
        return Ok(entry.orders);
      }
      debug!(
        status = key,
        cached = entry.summary_count,
        current,
        "summary count changed, re-fetching list"
      );
    }

    let orders = self.inner.orders_by_status(status).await?;
    self.cache.store_status_list(
      key,
      StatusListEntry {
        orders: orders.clone(),
        summary_count: current,
      },
    );

    Ok(orders)
  }

  /// Summary counts for the gate, exposed so the aggregation engine can
  /// verify the session and the summary endpoint up front. A failure here
  /// aborts the whole run; later per-status failures only shrink it.
  pub async fn ensure_summary(&self) -> ApiResult<SummaryCounts> {
    self.fresh_summary().await
  }

  /// Current summary counts, reusing the cached snapshot while it is within
  /// the freshness window.
  async fn fresh_summary(&self) -> ApiResult<SummaryCounts> {
    if let Some(snapshot) = self.cache.summary_snapshot() {
      if snapshot.age() <= self.cache.summary_freshness {
        return Ok(snapshot.counts);
      }
    }

    let counts = self.inner.summary().await?;
    self.cache.set_summary(counts);
    Ok(counts)
  }

  /// History is never cached: it is fetched per order, per run.
  pub async fn order_history(&self, id: &str) -> ApiResult<Vec<StatusEvent>> {
    self.inner.order_history(id).await
  }

  pub async fn order_detail(&self, id: &str) -> ApiResult<Option<Order>> {
    self.inner.order_detail(id).await
  }

  pub async fn order_photos(&self, id: &str) -> ApiResult<Vec<PhotoRef>> {
    self.inner.order_photos(id).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::upstream::client::testing::ScriptedTransport;
  use crate::upstream::client::{RawResponse, RetryConfig};
  use crate::upstream::session::RemoteSession;
  use chrono::Duration;
  use serde_json::{json, Value};

  fn login_ok() -> ApiResult<RawResponse> {
    Ok(RawResponse {
      status: 200,
      body: json!({ "result": true, "token": "tok" }),
    })
  }

  fn ok(body: Value) -> ApiResult<RawResponse> {
    Ok(RawResponse { status: 200, body })
  }

  fn summary(done: u64) -> ApiResult<RawResponse> {
    ok(json!({ "result": { "done": done } }))
  }

  fn order_list(numbers: &[&str]) -> ApiResult<RawResponse> {
    let records: Vec<Value> = numbers.iter().map(|n| json!({ "order_no": n })).collect();
    ok(json!({ "result": records }))
  }

  fn cached_client(
    script: Vec<ApiResult<RawResponse>>,
    summary_freshness: Duration,
  ) -> (CachedOrderClient<ScriptedTransport>, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new(script));
    let session = RemoteSession::new(Arc::clone(&transport), "http://up", "svc", "pw");
    let inner = RetryingClient::new(
      Arc::clone(&transport),
      session,
      "http://up",
      RetryConfig::default(),
    );
    let cache = Arc::new(OrderCache::new(Duration::minutes(10), summary_freshness));
    (CachedOrderClient::new(inner, cache), transport)
  }

  #[tokio::test]
  async fn unchanged_summary_skips_list_endpoint() {
    let (client, transport) = cached_client(
      vec![login_ok(), summary(2), order_list(&["SO-1", "SO-2"])],
      Duration::seconds(5),
    );

    let first = client.orders_by_status(OrderStatus::Done).await.unwrap();
    assert_eq!(first.len(), 2);
    let calls_after_first = transport.calls();

    // Within the freshness window: neither the summary nor the list
    // endpoint is hit again.
    let second = client.orders_by_status(OrderStatus::Done).await.unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(transport.calls(), calls_after_first);
  }

  #[tokio::test]
  async fn changed_count_refetches_list() {
    let (client, transport) = cached_client(
      vec![
        login_ok(),
        summary(1),
        order_list(&["SO-1"]),
        summary(2),
        order_list(&["SO-1", "SO-2"]),
      ],
      // Zero freshness window: every access re-fetches the summary.
      Duration::zero(),
    );

    let first = client.orders_by_status(OrderStatus::Done).await.unwrap();
    assert_eq!(first.len(), 1);

    let second = client.orders_by_status(OrderStatus::Done).await.unwrap();
    assert_eq!(second.len(), 2);

    let urls = transport.urls();
    let list_calls = urls.iter().filter(|u| u.contains("order_list_by_status")).count();
    assert_eq!(list_calls, 2);
  }

  #[tokio::test]
  async fn unchanged_count_with_stale_summary_still_skips_list() {
    let (client, transport) = cached_client(
      vec![login_ok(), summary(1), order_list(&["SO-1"]), summary(1)],
      Duration::zero(),
    );

    client.orders_by_status(OrderStatus::Done).await.unwrap();
    // Summary is stale so it is re-fetched, but the count matches the
    // cached list: no second list call.
    client.orders_by_status(OrderStatus::Done).await.unwrap();

    let urls = transport.urls();
    let list_calls = urls.iter().filter(|u| u.contains("order_list_by_status")).count();
    assert_eq!(list_calls, 1);
    let summary_calls = urls.iter().filter(|u| u.contains("get_summary_order")).count();
    assert_eq!(summary_calls, 2);
  }

  #[tokio::test]
  async fn summary_failure_propagates() {
    let (client, _) = cached_client(
      vec![
        login_ok(),
        Ok(RawResponse {
          status: 500,
          body: Value::Null,
        }),
      ],
      Duration::seconds(5),
    );

    assert!(client.orders_by_status(OrderStatus::Done).await.is_err());
  }
}
