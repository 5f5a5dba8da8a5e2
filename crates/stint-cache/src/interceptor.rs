//! [`Interceptor`]: applies the routed policy to each request and manages the
//! versioned cache's install/activate lifecycle.

use std::sync::Arc;

use axum::http::StatusCode;
use reqwest::Url;
use serde::Serialize;
use stint_core::cache::CacheStorage;

use crate::{
  CacheConfig, Error, Result,
  fetch::Fetch,
  request::{AssetRequest, AssetResponse, CACHE_HEADER, FALLBACK_HEADER, cache_key},
  route::{Policy, RouteTable},
};

/// What to do with an intercepted request.
#[derive(Debug)]
pub enum Outcome {
  /// Not ours; send it to the network untouched.
  Passthrough,
  Respond(AssetResponse),
}

/// Result of [`Interceptor::install`].
#[derive(Debug, Default, Serialize)]
pub struct InstallReport {
  pub cache:  String,
  pub cached: Vec<String>,
  /// `(url, reason)` for every manifest entry that could not be cached.
  pub failed: Vec<(String, String)>,
}

pub struct Interceptor<C, F> {
  storage:    Arc<C>,
  fetcher:    Arc<F>,
  routes:     RouteTable,
  cache_name: String,
  origin:     Url,
  manifest:   Vec<Url>,
  fallback:   Url,
}

impl<C, F> Interceptor<C, F>
where
  C: CacheStorage,
  F: Fetch,
{
  pub fn new(
    storage: Arc<C>,
    fetcher: Arc<F>,
    config: &CacheConfig,
    routes: RouteTable,
  ) -> Result<Self> {
    let origin   = parse_url(&config.origin)?;
    let manifest = config
      .manifest
      .iter()
      .map(|entry| resolve(&origin, entry))
      .collect::<Result<Vec<_>>>()?;
    let fallback = resolve(&origin, &config.fallback_document)?;

    Ok(Self {
      storage,
      fetcher,
      routes,
      cache_name: config.cache_name(),
      origin,
      manifest,
      fallback,
    })
  }

  /// Name of the cache generation this interceptor reads and writes.
  pub fn cache_name(&self) -> &str { &self.cache_name }

  pub fn origin(&self) -> &Url { &self.origin }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  /// Fetch every manifest asset into the current cache. One asset failing
  /// does not stop the others.
  pub async fn install(&self) -> InstallReport {
    let mut report = InstallReport { cache: self.cache_name.clone(), ..Default::default() };

    for url in &self.manifest {
      let key = cache_key(url);
      match self.fetch_for_install(url).await {
        Ok(()) => report.cached.push(key),
        Err(err) => {
          tracing::warn!(url = %key, %err, "could not pre-cache asset");
          report.failed.push((key, err.to_string()));
        }
      }
    }

    tracing::info!(
      cache = %self.cache_name,
      cached = report.cached.len(),
      failed = report.failed.len(),
      "install complete"
    );
    report
  }

  async fn fetch_for_install(&self, url: &Url) -> Result<()> {
    let request  = AssetRequest::get(url.clone());
    let response = self.fetcher.fetch(&request).await?;
    if !response.status.is_success() {
      return Err(Error::UpstreamStatus(response.status.as_u16()));
    }
    self
      .storage
      .put_entry(&self.cache_name, &request.cache_key(), &response.to_cached())
      .await
      .map_err(Error::storage)
  }

  /// Delete every cache generation except the current one and start serving
  /// from it straight away. Returns the names deleted.
  pub async fn activate(&self) -> Result<Vec<String>> {
    let names = self.storage.cache_names().await.map_err(Error::storage)?;

    let mut deleted = Vec::new();
    for name in names.into_iter().filter(|name| *name != self.cache_name) {
      self.storage.delete_cache(&name).await.map_err(Error::storage)?;
      tracing::info!(cache = %name, "removed old cache");
      deleted.push(name);
    }

    tracing::info!(cache = %self.cache_name, "cache active");
    Ok(deleted)
  }

  // ── Requests ──────────────────────────────────────────────────────────────

  /// Apply the routed policy to `request`.
  pub async fn handle(&self, request: &AssetRequest) -> Outcome {
    let policy = self.routes.classify(request);
    tracing::debug!(url = %request.url, %policy, "intercepted");

    let response = match policy {
      Policy::Passthrough => return Outcome::Passthrough,
      Policy::NetworkOnly => self.network_only(request).await,
      Policy::NetworkFirstRefresh => self.network_first_refresh(request).await,
      Policy::CacheFirst => self.cache_first(request).await,
      Policy::NetworkFirst => self.network_first(request).await,
    };
    Outcome::Respond(response)
  }

  /// Like [`handle`](Self::handle), sending passthrough traffic to the
  /// network directly.
  pub async fn respond(&self, request: &AssetRequest) -> AssetResponse {
    match self.handle(request).await {
      Outcome::Respond(response) => response,
      Outcome::Passthrough => match self.fetcher.fetch(request).await {
        Ok(response) => response,
        Err(err) => {
          tracing::warn!(url = %request.url, %err, "passthrough request failed");
          AssetResponse::new(StatusCode::BAD_GATEWAY, err.to_string())
        }
      },
    }
  }

  async fn network_only(&self, request: &AssetRequest) -> AssetResponse {
    match self.fetcher.fetch(request).await {
      Ok(response) => response,
      Err(err) => {
        tracing::debug!(url = %request.url, %err, "data api unreachable");
        AssetResponse::offline_json()
      }
    }
  }

  async fn network_first_refresh(&self, request: &AssetRequest) -> AssetResponse {
    match self.fetcher.fetch(request).await {
      Ok(response) => {
        if response.status.is_success() {
          self.store(&request.cache_key(), &response).await;
        }
        response
      }
      Err(err) => {
        tracing::debug!(url = %request.url, %err, "network failed; trying cache");
        self
          .lookup(&request.cache_key())
          .await
          .unwrap_or_else(AssetResponse::unavailable)
      }
    }
  }

  async fn cache_first(&self, request: &AssetRequest) -> AssetResponse {
    let key = request.cache_key();
    if let Some(cached) = self.lookup(&key).await {
      return cached;
    }

    match self.fetcher.fetch(request).await {
      Ok(response) => {
        if response.status.is_success() {
          self.store(&key, &response).await;
        }
        response
      }
      Err(err) => {
        tracing::debug!(url = %request.url, %err, "uncached asset unreachable");
        AssetResponse::unavailable()
      }
    }
  }

  async fn network_first(&self, request: &AssetRequest) -> AssetResponse {
    let key = request.cache_key();
    let err = match self.fetcher.fetch(request).await {
      Ok(response) => {
        if response.status == StatusCode::OK {
          self.store(&key, &response).await;
        }
        return response;
      }
      Err(err) => err,
    };

    tracing::debug!(url = %request.url, %err, "network failed; trying cache");
    if let Some(cached) = self.lookup(&key).await {
      return cached;
    }

    if request.is_navigation() {
      if let Some(mut fallback) = self.lookup(&cache_key(&self.fallback)).await {
        fallback.status = StatusCode::SERVICE_UNAVAILABLE;
        return fallback.with_header(FALLBACK_HEADER, "1");
      }
      return AssetResponse::offline_page();
    }

    tracing::warn!(url = %request.url, "no cached copy available");
    AssetResponse::unavailable()
  }

  // ── Storage ───────────────────────────────────────────────────────────────

  /// A storage failure is a miss.
  async fn lookup(&self, key: &str) -> Option<AssetResponse> {
    let cached = match self.storage.match_entry(&self.cache_name, key).await {
      Ok(cached) => cached?,
      Err(err) => {
        tracing::warn!(%key, %err, "cache lookup failed");
        return None;
      }
    };
    match AssetResponse::from_cached(cached) {
      Ok(response) => Some(response.with_header(CACHE_HEADER, "hit")),
      Err(err) => {
        tracing::warn!(%key, %err, "ignoring unreadable cache entry");
        None
      }
    }
  }

  /// A storage failure leaves the response uncached.
  async fn store(&self, key: &str, response: &AssetResponse) {
    if let Err(err) = self
      .storage
      .put_entry(&self.cache_name, key, &response.to_cached())
      .await
    {
      tracing::warn!(%key, %err, "failed to cache response");
    }
  }
}

fn parse_url(raw: &str) -> Result<Url> {
  Url::parse(raw).map_err(|e| Error::InvalidUrl { url: raw.to_string(), message: e.to_string() })
}

/// Absolute entries as-is, anything else relative to `origin`.
fn resolve(origin: &Url, entry: &str) -> Result<Url> {
  origin
    .join(entry)
    .map_err(|e| Error::InvalidUrl { url: entry.to_string(), message: e.to_string() })
}
