//! In-memory caching for upstream data.
//!
//! The store itself lives here; the freshness-gate decision logic that uses
//! it sits in `upstream::cached_client`.

mod store;

pub use store::{CacheEntry, OrderCache, StatusListEntry, SummarySnapshot, TtlCache};
