// src/relay/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One upstream record, kept exactly as received.
pub type RawItem = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedItem {
    pub source: String,        // e.g. "zhihu"
    pub title: Option<Value>,  // title or text
    pub url: Option<Value>,    // url or link
    pub score: Option<Value>,  // hot or heat or rank
    pub ts: Value,             // timestamp or time or now (unix seconds)
    pub raw: RawItem,
}

/// What the ingest side answered. The body is never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardReceipt {
    /// HTTP status of the ingest POST; `None` for sinks that do not talk HTTP.
    pub status: Option<u16>,
    pub delivered: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub source: String,
    pub fetched: usize,
    pub receipt: ForwardReceipt,
}

#[async_trait::async_trait]
pub trait TrendingProvider: Send + Sync {
    /// Pull the raw response envelope (bare array or `{ "items": [...] }`).
    async fn fetch_envelope(&self) -> Result<Value>;
    fn source_id(&self) -> &str;
}

#[async_trait::async_trait]
pub trait IngestSink: Send + Sync {
    async fn deliver(&self, items: &[NormalizedItem]) -> Result<ForwardReceipt>;
    fn name(&self) -> &'static str;
}
