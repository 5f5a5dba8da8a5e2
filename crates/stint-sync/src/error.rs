//! Error type for `stint-sync`.
//!
//! Failures with a safe degraded path (the remote store is down) are absorbed
//! by the engine and never show up here for writes or reads. What remains has
//! no fallback tier and is handed to the caller.

use stint_core::{record::RecordId, remote::RemoteError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// No owner is resolved; nothing was read or written.
  #[error("no active identity")]
  Unauthenticated,

  /// The operation needs the remote store and it could not be reached.
  #[error("remote store unavailable: {0}")]
  RemoteUnavailable(#[source] RemoteError),

  /// The local store refused a transaction.
  #[error("local store failure: {0}")]
  LocalStore(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("record not found: {0}")]
  NotFound(RecordId),
}

impl Error {
  pub(crate) fn local<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::LocalStore(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
