//! Picks a caching policy for each intercepted request.

use axum::http::Method;
use strum::{AsRefStr, Display};

use crate::{config::RoutesConfig, request::AssetRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Policy {
  /// Not intercepted at all.
  Passthrough,
  /// Never cached; an offline JSON error when the network fails.
  NetworkOnly,
  /// Network first, refreshing the cached copy on every success.
  NetworkFirstRefresh,
  /// Cached copy first, populated from the network on a miss.
  CacheFirst,
  /// Network first, caching `200` responses, with a document fallback.
  NetworkFirst,
}

/// URL-substring routing, evaluated in priority order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
  data_api:          Vec<String>,
  client_library:    Vec<String>,
  static_assets:     Vec<String>,
  passthrough_hosts: Vec<String>,
}

impl RouteTable {
  pub fn new(config: &RoutesConfig) -> Self {
    Self {
      data_api:          config.data_api.clone(),
      client_library:    config.client_library.clone(),
      static_assets:     config.static_assets.clone(),
      passthrough_hosts: config.passthrough_hosts.clone(),
    }
  }

  pub fn classify(&self, request: &AssetRequest) -> Policy {
    let url = &request.url;

    if !matches!(url.scheme(), "http" | "https") || request.method != Method::GET {
      return Policy::Passthrough;
    }
    let host = url.host_str().unwrap_or_default();
    if url.path().contains("/ws") || self.passthrough_hosts.iter().any(|h| h == host) {
      return Policy::Passthrough;
    }

    let url = url.as_str();
    let hit = |patterns: &[String]| patterns.iter().any(|p| url.contains(p.as_str()));
    if hit(&self.data_api) {
      Policy::NetworkOnly
    } else if hit(&self.client_library) {
      Policy::NetworkFirstRefresh
    } else if hit(&self.static_assets) {
      Policy::CacheFirst
    } else {
      Policy::NetworkFirst
    }
  }
}
