//! Historical analytics: duration resolution, calendar bucketing, and the
//! aggregation engine that ties them to the upstream client.

pub mod dates;
pub mod duration;
pub mod engine;
pub mod period;
pub mod snapshot;
