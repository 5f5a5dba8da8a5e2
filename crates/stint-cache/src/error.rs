//! Errors raised while configuring or maintaining the asset cache.
//!
//! Request handling itself never fails: every policy degrades to a
//! synthesized response instead.

use thiserror::Error;

use crate::fetch::FetchError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid url {url:?}: {message}")]
  InvalidUrl { url: String, message: String },

  #[error("cache storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("cached entry is unreadable: {0}")]
  CorruptEntry(String),

  #[error("upstream answered {0}")]
  UpstreamStatus(u16),

  #[error(transparent)]
  Fetch(#[from] FetchError),
}

impl Error {
  pub(crate) fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Storage(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
