//! The `LocalStore` trait and the collections it is organised into.
//!
//! The trait is implemented by storage backends (e.g. `stint-store-sqlite`).
//! The orchestrator depends on this abstraction, not on any concrete backend.

use std::{fmt, future::Future};

use serde::{Serialize, de::DeserializeOwned};

use crate::record::{OutboxEntry, Record, RecordId, RecordKind};

// ─── Collections ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionRole {
  /// Confirmed records and cached mirrors of remote ones.
  Records,
  /// Writes not yet confirmed by the remote store.
  Outbox,
}

/// A named, keyed table holding exactly one document per id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Collection {
  pub kind: RecordKind,
  pub role: CollectionRole,
}

impl Collection {
  pub const fn records(kind: RecordKind) -> Self {
    Self { kind, role: CollectionRole::Records }
  }

  pub const fn outbox(kind: RecordKind) -> Self {
    Self { kind, role: CollectionRole::Outbox }
  }

  /// Every collection the schema defines up front.
  pub fn all() -> impl Iterator<Item = Collection> {
    RecordKind::ALL
      .into_iter()
      .flat_map(|kind| [Self::records(kind), Self::outbox(kind)])
  }

  /// `records_<kind>` or `outbox_<kind>`.
  pub fn name(&self) -> &'static str {
    match (self.role, self.kind) {
      (CollectionRole::Records, RecordKind::Session) => "records_session",
      (CollectionRole::Records, RecordKind::Song) => "records_song",
      (CollectionRole::Outbox, RecordKind::Session) => "outbox_session",
      (CollectionRole::Outbox, RecordKind::Song) => "outbox_song",
    }
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Anything that can be stored in a collection, keyed by its id.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
  fn id(&self) -> &RecordId;
}

impl Document for Record {
  fn id(&self) -> &RecordId { &self.id }
}

impl Document for OutboxEntry {
  fn id(&self) -> &RecordId { &self.id }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the embedded, persistent, transactional local store.
///
/// Each method is a scoped transaction against one named collection. A
/// refused transaction (quota exceeded, store unusable) is reported as an
/// error value; it is recoverable and must never take the process down.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait LocalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Upsert `doc` by id.
  fn put<'a, D: Document>(
    &'a self,
    collection: Collection,
    doc: &'a D,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Every document in the collection, in insertion order. An upsert keeps
  /// the document's original position.
  fn get_all<D: Document>(
    &self,
    collection: Collection,
  ) -> impl Future<Output = Result<Vec<D>, Self::Error>> + Send + '_;

  /// Remove the document with `id`. Removing a missing id is not an error.
  fn delete<'a>(
    &'a self,
    collection: Collection,
    id: &'a RecordId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove every document in the collection.
  fn clear(
    &self,
    collection: Collection,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Clear the collection and insert `docs`, as one transaction.
  fn replace_all<'a, D: Document>(
    &'a self,
    collection: Collection,
    docs: &'a [D],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
