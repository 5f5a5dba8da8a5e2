//! Error type for `stint-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  /// The database file or its volume is full. Callers should surface the
  /// failed operation rather than retry it blindly.
  #[error("storage quota exceeded: {0}")]
  QuotaExceeded(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("corrupt row: {0}")]
  Corrupt(String),
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, _)) = &err
      && code.code == ErrorCode::DiskFull
    {
      return Error::QuotaExceeded(err);
    }
    Error::Database(err)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
