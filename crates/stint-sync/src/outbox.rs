//! The outbox: per-kind queues of writes the remote store has not confirmed.
//!
//! Built entirely on [`LocalStore`] primitives over the two `outbox_<kind>`
//! collections. There is no size cap and no backoff bookkeeping; an entry is
//! retried on the next reconcile, whenever that happens.

use std::sync::Arc;

use chrono::Utc;
use stint_core::{
  record::{OutboxEntry, OwnerId, Payload, RecordId, RecordKind},
  store::{Collection, LocalStore},
};

pub struct Outbox<L> {
  store: Arc<L>,
}

impl<L> Clone for Outbox<L> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<L: LocalStore> Outbox<L> {
  pub fn new(store: Arc<L>) -> Self { Self { store } }

  /// Queue a write. A provisional local id is minted when `id` is `None`.
  pub async fn enqueue(
    &self,
    kind: RecordKind,
    owner: &OwnerId,
    id: Option<RecordId>,
    payload: &Payload,
  ) -> Result<OutboxEntry, L::Error> {
    let entry = OutboxEntry {
      id:        id.unwrap_or_else(|| RecordId::mint_local(kind)),
      owner:     Some(owner.clone()),
      queued_at: Utc::now(),
      fields:    payload.semantic(),
    };
    self.store.put(Collection::outbox(kind), &entry).await?;
    tracing::debug!(%kind, id = %entry.id, "write queued");
    Ok(entry)
  }

  /// Every queued entry of `kind`, in the order it was enqueued. Nothing is
  /// removed. `queued_at` is informational and never reorders the queue.
  pub async fn drain(&self, kind: RecordKind) -> Result<Vec<OutboxEntry>, L::Error> {
    self.store.get_all(Collection::outbox(kind)).await
  }

  /// Drop an entry once the remote store has confirmed the write.
  pub async fn acknowledge(&self, kind: RecordKind, id: &RecordId) -> Result<(), L::Error> {
    self.store.delete(Collection::outbox(kind), id).await?;
    tracing::debug!(%kind, %id, "queued write acknowledged");
    Ok(())
  }
}
