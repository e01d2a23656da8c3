// tests/relay_pipeline.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use trend_relay::relay::providers::newsnow::NewsnowProvider;
use trend_relay::{run_once, ForwardReceipt, IngestSink, NormalizedItem, TrendingProvider};

struct MockProvider {
    envelope: Option<Value>,
}

#[async_trait]
impl TrendingProvider for MockProvider {
    async fn fetch_envelope(&self) -> Result<Value> {
        self.envelope
            .clone()
            .ok_or_else(|| anyhow!("upstream unavailable"))
    }
    fn source_id(&self) -> &str {
        "zhihu"
    }
}

#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<Vec<NormalizedItem>>>,
}

#[async_trait]
impl IngestSink for RecordingSink {
    async fn deliver(&self, items: &[NormalizedItem]) -> Result<ForwardReceipt> {
        self.batches.lock().push(items.to_vec());
        Ok(ForwardReceipt {
            status: Some(202),
            delivered: items.len(),
        })
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

#[tokio::test]
async fn pipeline_forwards_whole_batch_once() {
    let provider = MockProvider {
        envelope: Some(json!({"items": [{"title": "A", "hot": 5}, {"text": "B"}]})),
    };
    let sink = RecordingSink::default();

    let report = run_once(&provider, &sink, 1_000).await.expect("run ok");
    assert_eq!(report.source, "zhihu");
    assert_eq!(report.fetched, 2);
    assert_eq!(report.receipt.status, Some(202));

    let batches = sink.batches.lock();
    assert_eq!(batches.len(), 1, "exactly one forward per run");
    assert_eq!(batches[0][0].title, Some(json!("A")));
    assert_eq!(batches[0][1].title, Some(json!("B")));
    assert_eq!(batches[0][1].ts, json!(1_000));
}

#[tokio::test]
async fn fetch_failure_never_reaches_sink() {
    let provider = MockProvider { envelope: None };
    let sink = RecordingSink::default();

    let err = run_once(&provider, &sink, 0).await.unwrap_err();
    assert!(format!("{err:#}").contains("upstream unavailable"));
    assert!(sink.batches.lock().is_empty());
}

#[tokio::test]
async fn degenerate_envelope_never_reaches_sink() {
    let provider = MockProvider {
        envelope: Some(json!({"status": "error", "message": "unknown source"})),
    };
    let sink = RecordingSink::default();

    assert!(run_once(&provider, &sink, 0).await.is_err());
    assert!(sink.batches.lock().is_empty());
}

#[tokio::test]
async fn empty_items_still_forwards_empty_array() {
    let provider = MockProvider {
        envelope: Some(json!({"items": []})),
    };
    let sink = RecordingSink::default();

    let report = run_once(&provider, &sink, 0).await.unwrap();
    assert_eq!(report.fetched, 0);
    assert_eq!(sink.batches.lock().len(), 1);
}

#[tokio::test]
async fn saved_response_replays_through_pipeline() {
    let body = include_str!("fixtures/newsnow_zhihu.json");
    let provider = NewsnowProvider::from_fixture_str("zhihu", body);
    let sink = RecordingSink::default();

    let report = run_once(&provider, &sink, 1).await.unwrap();
    assert_eq!(report.fetched, 3);
}
