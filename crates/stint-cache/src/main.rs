//! `stint-proxy`: serves the application through the offline asset cache.
//!
//! Reads `stint.toml` (or the path given with `--config`) layered with
//! `STINT_*` environment variables, pre-caches the asset manifest, drops
//! older cache generations, and starts intercepting.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use stint_cache::{HttpFetcher, Interceptor, ProxyConfig, RouteTable};
use stint_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Stint offline asset proxy")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "stint.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("STINT")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let proxy_cfg: ProxyConfig = settings
    .try_deserialize()
    .context("failed to deserialise ProxyConfig")?;

  // The store opens lazily on the first cache operation.
  let store   = Arc::new(SqliteStore::new(proxy_cfg.store_path.clone()));
  let fetcher = HttpFetcher::new(Duration::from_secs(proxy_cfg.timeout_secs))
    .context("failed to build http client")?;

  let interceptor = Interceptor::new(
    store,
    Arc::new(fetcher),
    &proxy_cfg.cache,
    RouteTable::new(&proxy_cfg.routes),
  )
  .context("invalid cache configuration")?;

  interceptor.install().await;
  interceptor
    .activate()
    .await
    .context("failed to activate cache")?;

  let app     = stint_cache::proxy::router(Arc::new(interceptor));
  let address = format!("{}:{}", proxy_cfg.host, proxy_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
