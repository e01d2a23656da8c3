//! trend-relay — binary entrypoint.
//! Fetches one trending source, normalizes it and forwards the batch once.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trend_relay::metrics::Metrics;
use trend_relay::relay::forward::{HttpIngestSink, StdoutSink};
use trend_relay::relay::providers::newsnow::NewsnowProvider;
use trend_relay::{run_once, IngestSink, RelayConfig};

#[derive(Parser, Debug)]
#[command(name = "trend-relay")]
#[command(about = "Relay one newsnow trending source to the internal ingest endpoint")]
#[command(version)]
struct Cli {
    /// Config file (TOML or JSON). Defaults to $RELAY_CONFIG_PATH, then config/relay.{toml,json}
    #[arg(long)]
    config: Option<PathBuf>,
    /// Source id requested from the aggregator (e.g. zhihu)
    #[arg(long)]
    source: Option<String>,
    /// Aggregator base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Ingest backend base URL
    #[arg(long)]
    backend_url: Option<String>,
    /// Ingest path segment; defaults to the source id
    #[arg(long)]
    channel: Option<String>,
    /// Replay a saved upstream response instead of calling the aggregator
    #[arg(long)]
    from_file: Option<PathBuf>,
    /// Print the normalized batch instead of posting it
    #[arg(long)]
    dry_run: bool,
    /// Dump Prometheus metrics to stderr after the run
    #[arg(long)]
    print_metrics: bool,
}

/// Compact logs on stderr; `RELAY_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trend_relay=info,relay=info,warn"));

    let json = std::env::var("RELAY_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn apply_cli(mut cfg: RelayConfig, cli: &Cli) -> Result<RelayConfig> {
    if let Some(s) = &cli.source {
        cfg.source_id = s.clone();
    }
    if let Some(u) = &cli.base_url {
        cfg.base_url = u.clone();
    }
    if let Some(u) = &cli.backend_url {
        cfg.backend_url = Some(u.clone());
    }
    if let Some(c) = &cli.channel {
        cfg.ingest_channel = Some(c.clone());
    }
    cfg.sanitized()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = apply_cli(RelayConfig::resolve(cli.config.as_deref())?, &cli)?;

    let metrics = if cli.print_metrics {
        Some(Metrics::init()?)
    } else {
        None
    };

    let provider = match &cli.from_file {
        Some(path) => {
            let body = std::fs::read_to_string(path)
                .with_context(|| format!("reading saved response {}", path.display()))?;
            NewsnowProvider::from_fixture_str(&cfg.source_id, &body)
        }
        None => NewsnowProvider::from_config(&cfg),
    };

    let sink: Box<dyn IngestSink> = if cli.dry_run {
        Box::new(StdoutSink)
    } else {
        let http = HttpIngestSink::from_config(&cfg)?;
        tracing::debug!(endpoint = http.endpoint(), "forwarding to ingest");
        Box::new(http)
    };

    let now = chrono::Utc::now().timestamp();
    let report = run_once(&provider, sink.as_ref(), now).await?;

    tracing::info!(
        source = %report.source,
        items = report.fetched,
        delivered = report.receipt.delivered,
        "done"
    );

    if let Some(m) = metrics {
        eprintln!("{}", m.render());
    }
    Ok(())
}
