use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;
use std::time::Duration;

use crate::config::relay::RelayConfig;
use crate::relay::types::TrendingProvider;

/// Pulls one source (`/api/s?id=<source>`) from a newsnow-style aggregator.
pub struct NewsnowProvider {
    source_id: String,
    mode: Mode,
}

enum Mode {
    // Saved response body, decoded instead of hitting the network.
    Fixture(String),
    Http {
        endpoint: String,
        client: reqwest::Client,
        timeout: Duration,
    },
}

impl NewsnowProvider {
    pub fn from_fixture_str(source_id: &str, body: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_url(base_url: &str, source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            mode: Mode::Http {
                endpoint: format!("{}/api/s", base_url.trim_end_matches('/')),
                client: reqwest::Client::new(),
                timeout: Duration::from_secs(crate::config::relay::DEFAULT_TIMEOUT_SECS),
            },
        }
    }

    pub fn from_config(cfg: &RelayConfig) -> Self {
        Self::from_url(&cfg.base_url, &cfg.source_id).with_timeout(cfg.fetch_timeout_secs)
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        if let Mode::Http { timeout, .. } = &mut self.mode {
            *timeout = Duration::from_secs(secs);
        }
        self
    }

    fn decode(body: &str) -> Result<Value> {
        serde_json::from_str(body).context("decoding newsnow json")
    }
}

#[async_trait]
impl TrendingProvider for NewsnowProvider {
    async fn fetch_envelope(&self) -> Result<Value> {
        let t0 = std::time::Instant::now();
        counter!("relay_fetch_total").increment(1);

        let envelope = match &self.mode {
            Mode::Fixture(body) => Self::decode(body)?,
            Mode::Http {
                endpoint,
                client,
                timeout,
            } => {
                let resp = client
                    .get(endpoint.as_str())
                    .query(&[("id", self.source_id.as_str())])
                    .timeout(*timeout)
                    .send()
                    .await
                    .context("newsnow http get")?
                    .error_for_status()
                    .context("newsnow non-2xx")?;
                let body = resp.text().await.context("newsnow http .text()")?;
                Self::decode(&body)?
            }
        };

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("relay_fetch_ms").record(ms);
        tracing::debug!(source = %self.source_id, elapsed_ms = ms, "upstream envelope fetched");
        Ok(envelope)
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_mode_decodes_body() {
        let p = NewsnowProvider::from_fixture_str("zhihu", r#"{"items":[{"title":"A"}]}"#);
        let v = p.fetch_envelope().await.unwrap();
        assert_eq!(v["items"][0]["title"], "A");
        assert_eq!(p.source_id(), "zhihu");
    }

    #[tokio::test]
    async fn fixture_mode_rejects_garbage() {
        let p = NewsnowProvider::from_fixture_str("zhihu", "<html>oops</html>");
        let err = p.fetch_envelope().await.unwrap_err();
        assert!(format!("{err:#}").contains("decoding newsnow json"));
    }
}
