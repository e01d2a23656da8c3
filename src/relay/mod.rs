// src/relay/mod.rs
pub mod forward;
pub mod normalize;
pub mod providers;
pub mod types;

use crate::relay::types::{IngestSink, RelayReport, TrendingProvider};
use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

pub use crate::relay::normalize::{items_from_envelope, normalize_batch, normalize_item};

/// One-time metrics registration (so series show up in the exposition).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_fetch_total", "Upstream fetch attempts.");
        describe_counter!(
            "relay_fetch_errors_total",
            "Upstream fetch/decode failures."
        );
        describe_counter!("relay_items_total", "Records normalized for forwarding.");
        describe_counter!("relay_forward_total", "Ingest POSTs that got a response.");
        describe_counter!(
            "relay_forward_non_2xx_total",
            "Ingest POSTs answered with a non-2xx status."
        );
        describe_histogram!("relay_fetch_ms", "Upstream fetch time in milliseconds.");
        describe_gauge!("relay_last_run_ts", "Unix ts when the relay last completed.");
    });
}

/// Fetch, normalize and forward once. The first failure aborts the run;
/// nothing is forwarded when the fetch or the envelope is bad.
pub async fn run_once(
    provider: &dyn TrendingProvider,
    sink: &dyn IngestSink,
    now: i64,
) -> Result<RelayReport> {
    ensure_metrics_described();
    let source = provider.source_id().to_string();

    let envelope = match provider.fetch_envelope().await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = ?e, source = %source, "upstream fetch failed");
            counter!("relay_fetch_errors_total").increment(1);
            return Err(e.context(format!("fetching source `{source}`")));
        }
    };

    let items = normalize_batch(&source, envelope, now)?;
    counter!("relay_items_total").increment(items.len() as u64);

    let receipt = sink.deliver(&items).await?;
    gauge!("relay_last_run_ts").set(now as f64);

    tracing::info!(
        target: "relay",
        source = %source,
        items = items.len(),
        sink = sink.name(),
        status = ?receipt.status,
        "relay run finished"
    );

    Ok(RelayReport {
        source,
        fetched: items.len(),
        receipt,
    })
}
