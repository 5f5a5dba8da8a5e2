//! Axum front for the interceptor.
//!
//! Every inbound request, whatever its path, is turned into an
//! [`AssetRequest`] against the configured origin (or kept as-is when it
//! arrives in absolute form) and answered by [`Interceptor::respond`].

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  extract::{Request, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use reqwest::Url;
use stint_core::cache::CacheStorage;
use tower_http::trace::TraceLayer;

use crate::{fetch::Fetch, interceptor::Interceptor, request::AssetRequest};

const MAX_BODY: usize = 8 * 1024 * 1024;

pub fn router<C, F>(interceptor: Arc<Interceptor<C, F>>) -> Router
where
  C: CacheStorage + 'static,
  F: Fetch + 'static,
{
  Router::new()
    .fallback(intercept::<C, F>)
    .layer(TraceLayer::new_for_http())
    .with_state(interceptor)
}

async fn intercept<C, F>(
  State(interceptor): State<Arc<Interceptor<C, F>>>,
  req: Request<Body>,
) -> Response
where
  C: CacheStorage + 'static,
  F: Fetch + 'static,
{
  match asset_request(interceptor.origin(), req).await {
    Ok(request) => interceptor.respond(&request).await.into_response(),
    Err(resp) => resp,
  }
}

async fn asset_request(origin: &Url, req: Request<Body>) -> Result<AssetRequest, Response> {
  let (parts, body) = req.into_parts();

  let url = if parts.uri.scheme().is_some() {
    Url::parse(&parts.uri.to_string())
  } else {
    origin.join(parts.uri.path_and_query().map_or("/", |pq| pq.as_str()))
  }
  .map_err(|e| {
    (StatusCode::BAD_REQUEST, format!("cannot resolve {}: {e}", parts.uri)).into_response()
  })?;

  let body = axum::body::to_bytes(body, MAX_BODY)
    .await
    .map_err(|_| (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response())?;

  let destination = parts
    .headers
    .get("sec-fetch-dest")
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned);

  Ok(AssetRequest { method: parts.method, url, destination, headers: parts.headers, body })
}
