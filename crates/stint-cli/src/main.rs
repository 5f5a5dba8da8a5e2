//! `stint`, the command-line front end for the offline-first practice log.
//!
//! # Usage
//!
//! ```
//! stint --owner alice add session -f date=2026-03-14 -f instrument=piano -f minutes=30
//! stint --owner alice list session
//! stint --owner alice sync
//! stint --config ~/.config/stint/stint.toml watch
//! ```
//!
//! Every command prints JSON on stdout; logs go to stderr.

mod commands;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use stint_core::{
  record::{OwnerId, RecordKind},
  remote::RemoteStore as _,
};
use stint_remote::{HttpRemote, RemoteConfig};
use stint_store_sqlite::SqliteStore;
use stint_sync::{Connectivity, SyncContext, SyncEngine};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "stint", version, about = "Offline-first practice log")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "stint.toml")]
  config: PathBuf,

  /// Acting owner. Without one, writes are refused and reads are empty.
  #[arg(long, env = "STINT_OWNER")]
  owner: Option<String>,

  /// Start offline instead of probing the remote store.
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Record a new session or song.
  Add {
    kind:   RecordKind,
    /// A JSON object with the record's fields.
    #[arg(long, value_name = "OBJECT")]
    json:   Option<String>,
    /// A single field; values that parse as JSON are stored as such.
    #[arg(short, long = "field", value_name = "KEY=VALUE", value_parser = commands::parse_field)]
    fields: Vec<(String, Value)>,
  },
  /// List your records.
  List { kind: RecordKind },
  /// Delete one record.
  Remove { kind: RecordKind, id: String },
  /// Delete every record of a kind, everywhere.
  Reset { kind: RecordKind },
  /// Show writes waiting to sync.
  Pending { kind: RecordKind },
  /// Push queued writes to the remote store now.
  Sync,
  /// Stay running and sync whenever the connection comes back.
  Watch {
    /// Heartbeat interval in seconds.
    #[arg(long)]
    interval: Option<u64>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

fn default_store_path() -> PathBuf { PathBuf::from("stint.db") }

fn default_heartbeat_interval_secs() -> u64 { 15 }

#[derive(Deserialize, Debug)]
struct CliConfig {
  remote:              RemoteConfig,
  #[serde(default = "default_store_path")]
  store_path:          PathBuf,
  #[serde(default)]
  owner:               Option<String>,
  #[serde(default = "default_heartbeat_interval_secs")]
  heartbeat_interval_secs: u64,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

pub(crate) type Engine = SyncEngine<SqliteStore, HttpRemote>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(args.config.clone()).required(false))
    .add_source(
      config::Environment::with_prefix("STINT")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;
  let cli_cfg: CliConfig = settings
    .try_deserialize()
    .context("failed to deserialise CliConfig")?;

  // Flag overrides config file.
  let ctx = SyncContext::from(args.owner.or(cli_cfg.owner).map(OwnerId::new));

  let remote = Arc::new(HttpRemote::new(cli_cfg.remote).context("building remote client")?);
  let store  = Arc::new(SqliteStore::new(cli_cfg.store_path.clone()));

  let online = !args.offline
    && match remote.ping().await {
      Ok(()) => true,
      Err(err) => {
        tracing::warn!(%err, "remote store unreachable; starting offline");
        false
      }
    };
  let engine = SyncEngine::new(store, Arc::clone(&remote), Connectivity::new(online));

  let interval = Duration::from_secs(cli_cfg.heartbeat_interval_secs);
  commands::run(&engine, remote, &ctx, args.command, interval).await
}
