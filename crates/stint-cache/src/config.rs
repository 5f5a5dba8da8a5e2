//! Proxy configuration, deserialised from `stint.toml` and `STINT_*`
//! environment variables.

use std::path::PathBuf;

use serde::Deserialize;

/// Which cache generation is current and what it is seeded with.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Cache names are `<prefix>-v<version>`.
  #[serde(default = "default_prefix")]
  pub prefix:            String,
  /// Bumped on every release; the only way stale assets are invalidated.
  pub version:           u32,
  /// Origin the application's own assets are served from.
  pub origin:            String,
  /// Assets fetched into the cache on install. Relative entries are resolved
  /// against `origin`.
  #[serde(default)]
  pub manifest:          Vec<String>,
  /// Document served to navigations that miss both network and cache.
  #[serde(default = "default_fallback_document")]
  pub fallback_document: String,
}

impl CacheConfig {
  pub fn new(origin: impl Into<String>, version: u32) -> Self {
    Self {
      prefix: default_prefix(),
      version,
      origin: origin.into(),
      manifest: Vec::new(),
      fallback_document: default_fallback_document(),
    }
  }

  pub fn cache_name(&self) -> String { format!("{}-v{}", self.prefix, self.version) }
}

/// URL substrings that select a caching policy. Checked in the order
/// passthrough, data API, client library, static assets.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutesConfig {
  /// The remote store's data API. Never cached.
  #[serde(default = "default_data_api")]
  pub data_api:          Vec<String>,
  /// The remote store's client library. Network first, refreshed on success.
  #[serde(default)]
  pub client_library:    Vec<String>,
  /// Shared fonts and icons. Cache first.
  #[serde(default = "default_static_assets")]
  pub static_assets:     Vec<String>,
  /// Hosts whose traffic is never intercepted (development servers).
  #[serde(default)]
  pub passthrough_hosts: Vec<String>,
}

impl Default for RoutesConfig {
  fn default() -> Self {
    Self {
      data_api:          default_data_api(),
      client_library:    Vec::new(),
      static_assets:     default_static_assets(),
      passthrough_hosts: Vec::new(),
    }
  }
}

/// Runtime configuration for the `stint-proxy` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
  #[serde(default = "default_host")]
  pub host:         String,
  #[serde(default = "default_port")]
  pub port:         u16,
  /// SQLite file holding the cache entries.
  #[serde(default = "default_store_path")]
  pub store_path:   PathBuf,
  /// Upstream request timeout.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  pub cache:        CacheConfig,
  #[serde(default)]
  pub routes:       RoutesConfig,
}

fn default_prefix() -> String { "stint".to_string() }

fn default_fallback_document() -> String { "/index.html".to_string() }

fn default_data_api() -> Vec<String> { vec!["/api/".to_string()] }

fn default_static_assets() -> Vec<String> {
  vec!["fonts.googleapis.com".to_string(), "fonts.gstatic.com".to_string()]
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("stint-cache.db") }

fn default_timeout_secs() -> u64 { 30 }
