//! [`AssetRequest`] and [`AssetResponse`], the values the interceptor works
//! on, plus the synthesized responses it falls back to.

use axum::{
  http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use reqwest::Url;
use stint_core::cache::CachedResponse;

use crate::{Error, Result};

/// Set on responses served from the cache.
pub const CACHE_HEADER: &str = "x-stint-cache";
/// Set on the fallback document served to an offline navigation.
pub const FALLBACK_HEADER: &str = "x-stint-fallback";

/// Connection-scoped headers that must not be forwarded or stored.
const HOP_BY_HOP: [HeaderName; 8] = [
  header::CONNECTION,
  header::HOST,
  header::PROXY_AUTHENTICATE,
  header::PROXY_AUTHORIZATION,
  header::TE,
  header::TRAILER,
  header::TRANSFER_ENCODING,
  header::UPGRADE,
];

pub(crate) fn end_to_end(headers: &HeaderMap) -> HeaderMap {
  let mut headers = headers.clone();
  for name in &HOP_BY_HOP {
    headers.remove(name);
  }
  headers.remove("keep-alive");
  headers
}

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AssetRequest {
  pub method:      Method,
  pub url:         Url,
  /// What the client intends to do with the response (`Sec-Fetch-Dest`).
  pub destination: Option<String>,
  pub headers:     HeaderMap,
  pub body:        Bytes,
}

impl AssetRequest {
  /// A plain `GET` for a subresource.
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      destination: None,
      headers: HeaderMap::new(),
      body: Bytes::new(),
    }
  }

  /// A `GET` for a document the user navigated to.
  pub fn navigate(url: Url) -> Self {
    let mut request = Self::get(url);
    request.destination = Some("document".to_string());
    request
      .headers
      .insert(header::ACCEPT, HeaderValue::from_static("text/html"));
    request
  }

  /// Whether the response will be displayed as a page.
  pub fn is_navigation(&self) -> bool {
    self.destination.as_deref() == Some("document")
      || self
        .headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
  }

  /// Entries are keyed by URL; the fragment never reaches the server.
  pub fn cache_key(&self) -> String { cache_key(&self.url) }
}

pub(crate) fn cache_key(url: &Url) -> String {
  let mut url = url.clone();
  url.set_fragment(None);
  url.into()
}

// ─── Response ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AssetResponse {
  pub status:  StatusCode,
  pub headers: HeaderMap,
  pub body:    Bytes,
}

impl AssetResponse {
  pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
    Self { status, headers: HeaderMap::new(), body: body.into() }
  }

  pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
    self
      .headers
      .insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    self
  }

  /// What the data API answers with when the network is down.
  pub fn offline_json() -> Self {
    Self::new(StatusCode::SERVICE_UNAVAILABLE, r#"{"error":"offline"}"#)
      .with_header("content-type", "application/json")
  }

  /// Last-resort page for a navigation with nothing cached.
  pub fn offline_page() -> Self {
    Self::new(StatusCode::SERVICE_UNAVAILABLE, OFFLINE_PAGE)
      .with_header("content-type", "text/html; charset=utf-8")
  }

  /// Empty failure for any other miss.
  pub fn unavailable() -> Self { Self::new(StatusCode::SERVICE_UNAVAILABLE, Bytes::new()) }

  pub fn to_cached(&self) -> CachedResponse {
    CachedResponse {
      status:  self.status.as_u16(),
      headers: end_to_end(&self.headers)
        .iter()
        .filter_map(|(name, value)| {
          Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
        })
        .collect(),
      body:    self.body.clone(),
    }
  }

  pub fn from_cached(cached: CachedResponse) -> Result<Self> {
    let status = StatusCode::from_u16(cached.status)
      .map_err(|_| Error::CorruptEntry(format!("status {}", cached.status)))?;

    let mut headers = HeaderMap::with_capacity(cached.headers.len());
    for (name, value) in cached.headers {
      let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::CorruptEntry(format!("header name {name:?}")))?;
      let value = HeaderValue::from_str(&value)
        .map_err(|_| Error::CorruptEntry(format!("header value {value:?}")))?;
      headers.append(name, value);
    }

    Ok(Self { status, headers, body: cached.body })
  }
}

impl IntoResponse for AssetResponse {
  fn into_response(self) -> Response { (self.status, self.headers, self.body).into_response() }
}

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Offline</title>
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
      body {
        font-family: sans-serif;
        display: flex;
        justify-content: center;
        align-items: center;
        height: 100vh;
        margin: 0;
      }
      .offline-msg { text-align: center; padding: 40px; }
    </style>
  </head>
  <body>
    <div class="offline-msg">
      <h1>You're offline</h1>
      <p>This page is not available offline.</p>
      <p>Check your connection and try again.</p>
    </div>
  </body>
</html>
"#;
