//! The `RemoteStore` trait: the authoritative store of confirmed records.
//!
//! Each record kind is a flat schema of scalar fields plus an `owner` field
//! used as an equality filter in queries.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{OwnerId, Payload, Record, RecordId, RecordKind};

/// A failure to reach, or be served by, the remote store.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
  /// The connectivity monitor reports the device as offline.
  #[error("offline")]
  Offline,

  #[error("transport error: {0}")]
  Transport(String),

  #[error("remote store rejected the request ({status}): {message}")]
  Rejected { status: u16, message: String },

  #[error("could not decode remote response: {0}")]
  Decode(String),
}

impl RemoteError {
  /// Whether retrying the same request later can succeed.
  ///
  /// Client errors (4xx) and undecodable responses are treated as permanent;
  /// everything else is transient.
  pub fn is_transient(&self) -> bool {
    match self {
      RemoteError::Offline | RemoteError::Transport(_) => true,
      RemoteError::Rejected { status, .. } => !(400..500).contains(status),
      RemoteError::Decode(_) => false,
    }
  }
}

/// A record as returned by a remote query. The id may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
  #[serde(default)]
  pub id:     Option<RecordId>,
  #[serde(default)]
  pub owner:  Option<OwnerId>,
  #[serde(flatten)]
  pub fields: Payload,
}

impl RemoteRecord {
  /// Normalise into a mirror [`Record`], minting a remote-origin placeholder
  /// id when the remote store did not supply one.
  pub fn into_record(self, kind: RecordKind) -> Record {
    Record {
      id:     self.id.unwrap_or_else(|| RecordId::mint_cloud(kind)),
      owner:  self.owner,
      fields: self.fields.semantic(),
    }
  }
}

/// Abstraction over the authoritative remote store.
pub trait RemoteStore: Send + Sync {
  /// Insert a record and return the id the remote store generated for it.
  fn insert<'a>(
    &'a self,
    kind: RecordKind,
    owner: &'a OwnerId,
    payload: &'a Payload,
  ) -> impl Future<Output = Result<RecordId, RemoteError>> + Send + 'a;

  /// Every record of `kind` whose `owner` equals `owner`.
  fn query_by_owner<'a>(
    &'a self,
    kind: RecordKind,
    owner: &'a OwnerId,
  ) -> impl Future<Output = Result<Vec<RemoteRecord>, RemoteError>> + Send + 'a;

  fn delete<'a>(
    &'a self,
    kind: RecordKind,
    id: &'a RecordId,
  ) -> impl Future<Output = Result<(), RemoteError>> + Send + 'a;

  /// Cheap reachability check, used as a connectivity heartbeat.
  fn ping(&self) -> impl Future<Output = Result<(), RemoteError>> + Send + '_;
}
