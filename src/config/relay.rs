// src/config/relay.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://newsnow.busiyi.world";
pub const DEFAULT_SOURCE_ID: &str = "zhihu";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

pub const DEFAULT_RELAY_CONFIG_TOML: &str = "config/relay.toml";
pub const DEFAULT_RELAY_CONFIG_JSON: &str = "config/relay.json";

pub const ENV_RELAY_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const ENV_BASE_URL: &str = "NEWSNOW_BASE_URL";
pub const ENV_SOURCE_ID: &str = "NEWSNOW_SOURCE_ID";
pub const ENV_BACKEND_URL: &str = "INGEST_BACKEND_URL";
pub const ENV_INGEST_CHANNEL: &str = "INGEST_CHANNEL";

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    /// Aggregator root; `/api/s` is appended.
    pub base_url: String,
    pub source_id: String,
    /// Ingest backend root; `/internal/ingest/<channel>` is appended.
    pub backend_url: Option<String>,
    /// Last path segment of the ingest URL. Defaults to `source_id`.
    pub ingest_channel: Option<String>,
    #[serde(default = "default_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub forward_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            source_id: DEFAULT_SOURCE_ID.to_string(),
            backend_url: None,
            ingest_channel: None,
            fetch_timeout_secs: DEFAULT_TIMEOUT_SECS,
            forward_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RelayConfig {
    /// Load from an explicit path. TOML or JSON, picked by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading relay config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing relay config {}", path.display()))
    }

    /// Resolve the file layer:
    /// 1) explicit path
    /// 2) $RELAY_CONFIG_PATH
    /// 3) config/relay.toml
    /// 4) config/relay.json
    /// 5) built-in defaults
    pub fn load_file_layer(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_RELAY_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("RELAY_CONFIG_PATH points to non-existent path"));
        }
        for candidate in [DEFAULT_RELAY_CONFIG_TOML, DEFAULT_RELAY_CONFIG_JSON] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Ok(Self::default())
    }

    /// File layer, then environment overrides, then sanitizing.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::load_file_layer(explicit)?;
        cfg.apply_env_overrides();
        cfg.sanitized()
    }

    pub fn apply_env_overrides(&mut self) {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        if let Some(v) = var(ENV_BASE_URL) {
            self.base_url = v;
        }
        if let Some(v) = var(ENV_SOURCE_ID) {
            self.source_id = v;
        }
        if let Some(v) = var(ENV_BACKEND_URL) {
            self.backend_url = Some(v);
        }
        if let Some(v) = var(ENV_INGEST_CHANNEL) {
            self.ingest_channel = Some(v);
        }
    }

    pub fn sanitized(mut self) -> Result<Self> {
        self.source_id = self.source_id.trim().to_string();
        if self.source_id.is_empty() {
            bail!("source id must not be empty");
        }
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if self.base_url.is_empty() {
            self.base_url = DEFAULT_BASE_URL.to_string();
        }
        self.backend_url = self
            .backend_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        self.ingest_channel = self
            .ingest_channel
            .map(|c| c.trim().trim_matches('/').to_string())
            .filter(|c| !c.is_empty());
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.forward_timeout_secs == 0 {
            self.forward_timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        Ok(self)
    }

    pub fn channel(&self) -> &str {
        self.ingest_channel.as_deref().unwrap_or(&self.source_id)
    }

    /// Only required when a batch is actually posted.
    pub fn backend_url(&self) -> Result<&str> {
        self.backend_url.as_deref().ok_or_else(|| {
            anyhow!("no ingest backend configured (set {ENV_BACKEND_URL} or --backend-url)")
        })
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<RelayConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("relay config json");
    }
    match toml::from_str::<RelayConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s).map_err(|_| anyhow!(toml_err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_both_parse() {
        let toml = r#"
base_url = "http://agg.test/"
source_id = "weibo"
backend_url = "http://ingest.test"
"#;
        let cfg = parse_config(toml, "toml").unwrap().sanitized().unwrap();
        assert_eq!(cfg.base_url, "http://agg.test");
        assert_eq!(cfg.source_id, "weibo");
        assert_eq!(cfg.channel(), "weibo");
        assert_eq!(cfg.fetch_timeout_secs, 15);

        let json = r#"{"ingest_channel": "newsnow", "forward_timeout_secs": 0}"#;
        let cfg = parse_config(json, "json").unwrap().sanitized().unwrap();
        assert_eq!(cfg.source_id, "zhihu");
        assert_eq!(cfg.channel(), "newsnow");
        assert_eq!(cfg.forward_timeout_secs, 15);
    }

    #[test]
    fn empty_source_is_rejected() {
        let cfg = RelayConfig {
            source_id: "  ".into(),
            ..RelayConfig::default()
        };
        assert!(cfg.sanitized().is_err());
    }

    #[test]
    fn missing_backend_only_fails_on_use() {
        let cfg = RelayConfig::default().sanitized().unwrap();
        let err = cfg.backend_url().unwrap_err();
        assert!(err.to_string().contains(ENV_BACKEND_URL));
    }
}
