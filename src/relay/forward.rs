// src/relay/forward.rs
use anyhow::{Context, Result};
use metrics::counter;
use reqwest::Client;
use std::io::Write;
use std::time::Duration;

use crate::config::relay::{RelayConfig, DEFAULT_TIMEOUT_SECS};
use crate::relay::types::{ForwardReceipt, IngestSink, NormalizedItem};

/// POSTs the batch as a JSON array to `<backend>/internal/ingest/<channel>`.
///
/// The ingest response is not validated: a non-2xx status is logged and
/// counted, only transport failures are errors.
#[derive(Clone)]
pub struct HttpIngestSink {
    endpoint: String,
    client: Client,
    timeout: Duration,
}

pub fn ingest_endpoint(backend_url: &str, channel: &str) -> String {
    format!(
        "{}/internal/ingest/{}",
        backend_url.trim_end_matches('/'),
        channel
    )
}

impl HttpIngestSink {
    pub fn new(backend_url: &str, channel: &str) -> Self {
        Self {
            endpoint: ingest_endpoint(backend_url, channel),
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_config(cfg: &RelayConfig) -> Result<Self> {
        let backend = cfg.backend_url()?;
        Ok(Self::new(backend, cfg.channel()).with_timeout(cfg.forward_timeout_secs))
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl IngestSink for HttpIngestSink {
    async fn deliver(&self, items: &[NormalizedItem]) -> Result<ForwardReceipt> {
        let rsp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(items)
            .send()
            .await
            .with_context(|| format!("ingest post to {}", self.endpoint))?;

        counter!("relay_forward_total").increment(1);
        let status = rsp.status();
        if !status.is_success() {
            counter!("relay_forward_non_2xx_total").increment(1);
            tracing::warn!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "ingest endpoint answered non-2xx"
            );
        }

        Ok(ForwardReceipt {
            status: Some(status.as_u16()),
            delivered: items.len(),
        })
    }

    fn name(&self) -> &'static str {
        "http-ingest"
    }
}

/// Prints the batch instead of posting it.
pub struct StdoutSink;

#[async_trait::async_trait]
impl IngestSink for StdoutSink {
    async fn deliver(&self, items: &[NormalizedItem]) -> Result<ForwardReceipt> {
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, items).context("writing batch to stdout")?;
        writeln!(out).context("writing batch to stdout")?;
        Ok(ForwardReceipt {
            status: None,
            delivered: items.len(),
        })
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
