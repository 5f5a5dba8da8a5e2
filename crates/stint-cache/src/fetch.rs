//! The network side of the interceptor.

use std::{future::Future, time::Duration};

use thiserror::Error;

use crate::request::{AssetRequest, AssetResponse, end_to_end};

/// The request never produced a response. An HTTP error status is not a
/// fetch failure.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("network error: {0}")]
  Network(String),

  #[error("could not build http client: {0}")]
  Client(String),
}

pub trait Fetch: Send + Sync {
  fn fetch<'a>(
    &'a self,
    request: &'a AssetRequest,
  ) -> impl Future<Output = Result<AssetResponse, FetchError>> + Send + 'a;
}

/// [`Fetch`] over a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new(timeout: Duration) -> Result<Self, FetchError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| FetchError::Client(e.to_string()))?;
    Ok(Self { client })
  }
}

impl Fetch for HttpFetcher {
  async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, FetchError> {
    let resp = self
      .client
      .request(request.method.clone(), request.url.clone())
      .headers(end_to_end(&request.headers))
      .body(request.body.clone())
      .send()
      .await
      .map_err(|e| FetchError::Network(e.to_string()))?;

    let status  = resp.status();
    let headers = end_to_end(resp.headers());
    let body    = resp
      .bytes()
      .await
      .map_err(|e| FetchError::Network(e.to_string()))?;

    Ok(AssetResponse { status, headers, body })
  }
}
