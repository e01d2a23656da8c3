// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod metrics;
pub mod relay;

// ---- Re-exports for stable public API ----
pub use crate::config::relay::RelayConfig;
pub use crate::relay::run_once;
pub use crate::relay::types::{
    ForwardReceipt, IngestSink, NormalizedItem, RawItem, RelayReport, TrendingProvider,
};
