//! Error types for `stint-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("payload must be a JSON object, got {0}")]
  InvalidPayload(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
