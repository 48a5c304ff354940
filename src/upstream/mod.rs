//! Client stack for the upstream order tracker: session, retrying HTTP
//! client, and the freshness-gated cached wrapper.

pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod session;
pub mod types;
