//! In-memory TTL store for per-status order lists plus the last known
//! summary snapshot.
//!
//! One instance is created at startup and passed by reference to the client
//! and the aggregation engine; there is no process-global state. Entries are
//! read and replaced atomically per key, with no multi-key guarantee.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::upstream::types::{Order, SummaryCounts};

/// A cached value with its fetch time and time-to-live.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  pub value: T,
  pub fetched_at: DateTime<Utc>,
  pub ttl: Duration,
}

impl<T> CacheEntry<T> {
  fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now - self.fetched_at > self.ttl
  }
}

/// Generic TTL map. Expired entries are evicted on access.
pub struct TtlCache<T: Clone> {
  entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
  pub fn new() -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
    }
  }

  pub fn set(&self, key: &str, value: T, ttl: Duration) {
    let mut entries = self.entries.write().unwrap();
    entries.insert(
      key.to_string(),
      CacheEntry {
        value,
        fetched_at: Utc::now(),
        ttl,
      },
    );
  }

  pub fn get(&self, key: &str) -> Option<T> {
    let now = Utc::now();
    {
      let entries = self.entries.read().unwrap();
      match entries.get(key) {
        Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
        Some(_) => {}
        None => return None,
      }
    }
    // Expired: evict under the write lock.
    let mut entries = self.entries.write().unwrap();
    if entries.get(key).is_some_and(|e| e.is_expired(now)) {
      entries.remove(key);
    }
    None
  }

  /// Clear one key, or everything when no key is given.
  pub fn invalidate(&self, key: Option<&str>) {
    let mut entries = self.entries.write().unwrap();
    match key {
      Some(key) => {
        entries.remove(key);
      }
      None => entries.clear(),
    }
  }
}

/// The last summary fetched from upstream, with its capture time.
#[derive(Debug, Clone)]
pub struct SummarySnapshot {
  pub counts: SummaryCounts,
  pub captured_at: DateTime<Utc>,
}

impl SummarySnapshot {
  pub fn age(&self) -> Duration {
    Utc::now() - self.captured_at
  }
}

/// A cached per-status order list, together with the summary count that was
/// current when it was populated. The freshness gate compares this count
/// against the latest summary to decide whether a re-fetch is needed.
#[derive(Debug, Clone)]
pub struct StatusListEntry {
  pub orders: Vec<Order>,
  pub summary_count: u64,
}

/// Cache service owned by the process: per-status lists behind a TTL, plus
/// the summary snapshot slot.
pub struct OrderCache {
  lists: TtlCache<StatusListEntry>,
  summary: RwLock<Option<SummarySnapshot>>,
  /// TTL applied to stored status lists.
  pub list_ttl: Duration,
  /// How long a summary snapshot may be reused before a fresh one is fetched.
  pub summary_freshness: Duration,
}

impl OrderCache {
  pub fn new(list_ttl: Duration, summary_freshness: Duration) -> Self {
    Self {
      lists: TtlCache::new(),
      summary: RwLock::new(None),
      list_ttl,
      summary_freshness,
    }
  }

  pub fn status_list(&self, key: &str) -> Option<StatusListEntry> {
    self.lists.get(key)
  }

  pub fn store_status_list(&self, key: &str, entry: StatusListEntry) {
    self.lists.set(key, entry, self.list_ttl);
  }

  pub fn summary_snapshot(&self) -> Option<SummarySnapshot> {
    self.summary.read().unwrap().clone()
  }

  pub fn set_summary(&self, counts: SummaryCounts) {
    let mut slot = self.summary.write().unwrap();
    *slot = Some(SummarySnapshot {
      counts,
      captured_at: Utc::now(),
    });
  }

  /// Drop one status list, or the whole store including the summary.
  pub fn invalidate(&self, key: Option<&str>) {
    self.lists.invalidate(key);
    if key.is_none() {
      let mut slot = self.summary.write().unwrap();
      *slot = None;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn returns_value_before_ttl() {
    let cache: TtlCache<u32> = TtlCache::new();
    cache.set("k", 7, Duration::hours(1));
    assert_eq!(cache.get("k"), Some(7));
  }

  #[tokio::test]
  async fn evicts_after_ttl() {
    let cache: TtlCache<u32> = TtlCache::new();
    cache.set("k", 7, Duration::milliseconds(5));
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(cache.get("k"), None);
    // Evicted, not just hidden.
    assert!(cache.entries.read().unwrap().is_empty());
  }

  #[test]
  fn invalidate_single_key() {
    let cache: TtlCache<u32> = TtlCache::new();
    cache.set("a", 1, Duration::hours(1));
    cache.set("b", 2, Duration::hours(1));
    cache.invalidate(Some("a"));
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), Some(2));
  }

  #[test]
  fn invalidate_all_clears_summary_too() {
    let cache = OrderCache::new(Duration::minutes(10), Duration::seconds(5));
    cache.store_status_list(
      "done",
      StatusListEntry {
        orders: Vec::new(),
        summary_count: 3,
      },
    );
    cache.set_summary(SummaryCounts::default());

    cache.invalidate(None);
    assert!(cache.status_list("done").is_none());
    assert!(cache.summary_snapshot().is_none());
  }
}
