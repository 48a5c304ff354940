mod analytics;
mod cache;
mod config;
mod error;
mod upstream;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use analytics::engine::{AggregateParams, AggregationEngine};
use analytics::period::Granularity;
use cache::OrderCache;
use config::Config;
use upstream::cached_client::CachedOrderClient;
use upstream::client::{HttpTransport, RetryConfig, RetryingClient};
use upstream::session::RemoteSession;
use upstream::types::OrderStatus;

#[derive(Parser, Debug)]
#[command(name = "durasi")]
#[command(about = "Follow-up to resolution analytics for the service-order tracker")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/durasi/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Bucket granularity for the report
  #[arg(short, long, value_enum, default_value = "monthly")]
  view: Granularity,

  /// Only include orders created in this month (1-12)
  #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
  month: Option<u32>,

  /// Only include orders created in this year
  #[arg(short, long)]
  year: Option<i32>,

  /// Force a full re-fetch instead of using the persisted snapshot
  #[arg(short, long)]
  recalculate: bool,

  /// Status ids to aggregate (default: done and verified)
  #[arg(short, long, num_args = 1.., default_values_t = [15u16, 30u16])]
  status: Vec<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  // Logs go to stderr; stdout carries only the result JSON.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let password = Config::get_password()?;

  let statuses = args
    .status
    .iter()
    .map(|&id| OrderStatus::from_id(id).ok_or_else(|| eyre!("Unknown status id: {}", id)))
    .collect::<Result<Vec<_>>>()?;

  let transport = Arc::new(HttpTransport::new(Duration::from_secs(
    config.upstream.timeout_secs,
  ))?);
  let session = RemoteSession::new(
    Arc::clone(&transport),
    &config.upstream.url,
    &config.upstream.login,
    &password,
  );
  let client = RetryingClient::new(
    Arc::clone(&transport),
    session,
    &config.upstream.url,
    RetryConfig {
      max_attempts: config.retry.max_attempts,
      base_delay: Duration::from_secs(config.retry.base_delay_secs),
    },
  );
  let cache = Arc::new(OrderCache::new(
    chrono::Duration::minutes(config.cache.list_ttl_minutes),
    chrono::Duration::seconds(config.cache.summary_freshness_secs),
  ));
  let engine = AggregationEngine::new(
    CachedOrderClient::new(client, cache),
    config.snapshot_path.clone(),
  );

  let params = AggregateParams {
    statuses,
    granularity: args.view,
    month: args.month,
    year: args.year,
    recalculate: args.recalculate,
  };

  match engine.aggregate(&params).await {
    Ok(response) => {
      if response.data.is_empty() {
        eprintln!("Tidak ada data pada rentang waktu yang dipilih.");
      }
      println!("{}", serde_json::to_string_pretty(&response)?);
      Ok(())
    }
    Err(err) => {
      if err.is_offline() {
        eprintln!("Server order tracker sedang offline atau tidak dapat dihubungi.");
      }
      Err(err.into())
    }
  }
}
