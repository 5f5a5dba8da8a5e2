//! [`SyncEngine`]: routes writes to the remote store or the outbox, pulls
//! owner-scoped snapshots into the local mirror, and reconciles the outbox
//! once the network returns.

use std::{collections::HashSet, sync::Arc};

use serde::Serialize;
use stint_core::{
  record::{OutboxEntry, OwnerId, Payload, Record, RecordId, RecordKind},
  remote::{RemoteError, RemoteStore},
  store::{Collection, LocalStore},
};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::{
  Error, Result,
  connectivity::{Connectivity, OnlineTransitions},
  context::SyncContext,
  outbox::Outbox,
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of [`SyncEngine::add_record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
  pub id:      RecordId,
  /// `true` when the write was queued instead of confirmed remotely.
  pub offline: bool,
}

/// Why a queued entry could not be reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
  /// The remote store was unreachable or temporarily failing.
  Transient,
  /// The remote store rejected the payload; retrying will not help.
  Permanent,
  /// The remote write went through but the entry could not be removed, so
  /// the next reconcile will write it again.
  Unacknowledged,
}

impl From<&RemoteError> for FailureReason {
  fn from(err: &RemoteError) -> Self {
    if err.is_transient() { FailureReason::Transient } else { FailureReason::Permanent }
  }
}

/// One outbox entry that stayed queued after a reconcile pass.
#[derive(Debug, Clone, Error, Serialize)]
#[error("could not sync {kind} entry {id} ({reason:?}): {message}")]
pub struct SyncEntryFailure {
  pub kind:    RecordKind,
  pub id:      RecordId,
  pub reason:  FailureReason,
  pub message: String,
}

/// A queued entry the remote store confirmed during a reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncedEntry {
  pub kind:      RecordKind,
  pub local_id:  RecordId,
  pub remote_id: RecordId,
}

/// Summary of one [`SyncEngine::reconcile`] pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
  pub synced:    Vec<SyncedEntry>,
  pub failures:  Vec<SyncEntryFailure>,
  /// Whether the mirrors were re-pulled after draining.
  pub refreshed: bool,
}

impl ReconcileReport {
  pub fn is_empty(&self) -> bool { self.synced.is_empty() && self.failures.is_empty() }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The sync orchestrator.
///
/// Cloning is cheap; clones share the stores and the connectivity monitor.
pub struct SyncEngine<L, R> {
  local:        Arc<L>,
  remote:       Arc<R>,
  outbox:       Outbox<L>,
  connectivity: Connectivity,
}

impl<L, R> Clone for SyncEngine<L, R> {
  fn clone(&self) -> Self {
    Self {
      local:        Arc::clone(&self.local),
      remote:       Arc::clone(&self.remote),
      outbox:       self.outbox.clone(),
      connectivity: self.connectivity.clone(),
    }
  }
}

impl<L, R> SyncEngine<L, R>
where
  L: LocalStore,
  R: RemoteStore,
{
  pub fn new(local: Arc<L>, remote: Arc<R>, connectivity: Connectivity) -> Self {
    Self {
      outbox: Outbox::new(Arc::clone(&local)),
      local,
      remote,
      connectivity,
    }
  }

  pub fn connectivity(&self) -> &Connectivity { &self.connectivity }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Record a new `kind` record for the acting owner.
  ///
  /// Online, the remote store is written first and its id is mirrored
  /// locally. Offline, or if the remote write fails for any reason, the
  /// record is stored locally under a provisional id and queued; the call
  /// still succeeds with `offline: true`.
  pub async fn add_record(
    &self,
    ctx: &SyncContext,
    kind: RecordKind,
    payload: Payload,
  ) -> Result<AddOutcome> {
    let owner   = ctx.owner().ok_or(Error::Unauthenticated)?;
    let payload = payload.semantic();

    if !self.connectivity.is_online() {
      return self.write_offline(kind, owner, &payload).await;
    }

    match self.remote.insert(kind, owner, &payload).await {
      Ok(id) => {
        let record = Record { id: id.clone(), owner: Some(owner.clone()), fields: payload };
        // The remote copy is authoritative; a missing mirror entry is
        // repaired by the next pull.
        if let Err(err) = self.local.put(Collection::records(kind), &record).await {
          tracing::warn!(%kind, %id, %err, "could not mirror confirmed record");
        }
        tracing::debug!(%kind, %id, "record saved remotely");
        Ok(AddOutcome { id, offline: false })
      }
      Err(err) => {
        tracing::warn!(%kind, %err, "remote write failed; saving offline");
        self.write_offline(kind, owner, &payload).await
      }
    }
  }

  async fn write_offline(
    &self,
    kind: RecordKind,
    owner: &OwnerId,
    payload: &Payload,
  ) -> Result<AddOutcome> {
    let entry = self
      .outbox
      .enqueue(kind, owner, None, payload)
      .await
      .map_err(Error::local)?;

    if let Err(err) = self.local.put(Collection::records(kind), &entry.to_record()).await {
      // Leave nothing behind from a failed call.
      if let Err(undo) = self.outbox.acknowledge(kind, &entry.id).await {
        tracing::error!(%kind, id = %entry.id, %undo, "could not withdraw queued write");
      }
      return Err(Error::local(err));
    }

    tracing::info!(%kind, id = %entry.id, "saved offline; will sync when online");
    Ok(AddOutcome { id: entry.id, offline: true })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// The acting owner's records of `kind`.
  ///
  /// Online, the remote snapshot replaces the local mirror wholesale and is
  /// returned as-is. Offline, or if the remote query fails, the local mirror
  /// filtered to the owner is returned. Without an owner the result is empty.
  pub async fn get_records(&self, ctx: &SyncContext, kind: RecordKind) -> Result<Vec<Record>> {
    let Some(owner) = ctx.owner() else {
      return Ok(Vec::new());
    };

    if !self.connectivity.is_online() {
      return self.local_records(kind, owner).await;
    }

    match self.remote.query_by_owner(kind, owner).await {
      Ok(rows) => {
        let records: Vec<Record> = rows
          .into_iter()
          .map(|row| {
            let mut record = row.into_record(kind);
            record.owner.get_or_insert_with(|| owner.clone());
            record
          })
          .filter(|record| record.is_owned_by(owner))
          .collect();

        if let Err(err) = self.replace_mirror(kind, &records).await {
          tracing::warn!(%kind, %err, "could not refresh local mirror");
        }
        Ok(records)
      }
      Err(err) => {
        tracing::warn!(%kind, %err, "remote query failed; serving local records");
        self.local_records(kind, owner).await
      }
    }
  }

  async fn local_records(&self, kind: RecordKind, owner: &OwnerId) -> Result<Vec<Record>> {
    let mut records: Vec<Record> = self
      .local
      .get_all(Collection::records(kind))
      .await
      .map_err(Error::local)?;
    records.retain(|record| record.is_owned_by(owner));
    Ok(records)
  }

  /// Replace the mirror with `snapshot` plus every record still waiting in
  /// the outbox. Queued writes are the only local-only records, and they must
  /// survive a pull that raced them.
  async fn replace_mirror(&self, kind: RecordKind, snapshot: &[Record]) -> Result<(), L::Error> {
    let queued = self.outbox.drain(kind).await?;
    let known: HashSet<&RecordId> = snapshot.iter().map(|record| &record.id).collect();

    let mut mirror = snapshot.to_vec();
    mirror.extend(
      queued
        .iter()
        .filter(|entry| !known.contains(&entry.id))
        .map(OutboxEntry::to_record),
    );

    self.local.replace_all(Collection::records(kind), &mirror).await
  }

  /// The acting owner's queued writes of `kind`, oldest first.
  pub async fn pending(&self, ctx: &SyncContext, kind: RecordKind) -> Result<Vec<OutboxEntry>> {
    let Some(owner) = ctx.owner() else {
      return Ok(Vec::new());
    };
    let mut entries = self.outbox.drain(kind).await.map_err(Error::local)?;
    entries.retain(|entry| entry.is_owned_by(owner));
    Ok(entries)
  }

  // ── Reconcile ─────────────────────────────────────────────────────────────

  /// Replay the acting owner's queued writes against the remote store.
  ///
  /// Entries belonging to other owners are left alone. A failing entry stays
  /// queued and does not stop the rest of the batch. If anything was drained,
  /// every kind is re-pulled afterwards. Offline or without an owner this is
  /// a no-op.
  pub async fn reconcile(&self, ctx: &SyncContext) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    if !self.connectivity.is_online() {
      tracing::debug!("offline; skipping reconcile");
      return Ok(report);
    }
    let Some(owner) = ctx.owner() else {
      tracing::debug!("no identity; skipping reconcile");
      return Ok(report);
    };

    let mut drained = 0usize;
    for kind in RecordKind::ALL {
      let entries = self.outbox.drain(kind).await.map_err(Error::local)?;

      for entry in entries.into_iter().filter(|entry| entry.is_owned_by(owner)) {
        drained += 1;

        let payload   = entry.payload();
        let remote_id = match self.remote.insert(kind, owner, &payload).await {
          Ok(id) => id,
          Err(err) => {
            let failure = SyncEntryFailure {
              kind,
              id: entry.id,
              reason: FailureReason::from(&err),
              message: err.to_string(),
            };
            tracing::warn!(%failure, "queued write not synced");
            report.failures.push(failure);
            continue;
          }
        };

        let acknowledged = self.outbox.acknowledge(kind, &entry.id).await;
        match acknowledged {
          Ok(()) => {
            tracing::info!(%kind, local_id = %entry.id, %remote_id, "queued write synced");
            report.synced.push(SyncedEntry { kind, local_id: entry.id, remote_id });
          }
          Err(err) => {
            let failure = SyncEntryFailure {
              kind,
              id: entry.id,
              reason: FailureReason::Unacknowledged,
              message: err.to_string(),
            };
            tracing::error!(%failure, "synced write could not be dequeued");
            report.failures.push(failure);
          }
        }
      }
    }

    if drained > 0 {
      for kind in RecordKind::ALL {
        if let Err(err) = self.get_records(ctx, kind).await {
          tracing::warn!(%kind, %err, "refresh after sync failed");
        }
      }
      report.refreshed = true;
      tracing::info!(
        synced = report.synced.len(),
        failed = report.failures.len(),
        "sync complete"
      );
    }

    Ok(report)
  }

  /// Run [`reconcile`](Self::reconcile) on every online transition.
  ///
  /// `identity` is asked for the acting owner each time, so a sign-in or
  /// sign-out between transitions is honoured.
  pub fn spawn_reconciler<F>(
    &self,
    identity: F,
    mut transitions: OnlineTransitions,
  ) -> JoinHandle<()>
  where
    F: Fn() -> SyncContext + Send + 'static,
    L: 'static,
    R: 'static,
  {
    let engine = self.clone();
    tokio::spawn(async move {
      while transitions.next().await.is_some() {
        tracing::info!("connection restored; syncing queued writes");
        let ctx = identity();
        if let Err(err) = engine.reconcile(&ctx).await {
          tracing::error!(%err, "reconcile failed");
        }
      }
    })
  }

  // ── Deletes ───────────────────────────────────────────────────────────────

  /// Delete one of the acting owner's records.
  ///
  /// A write that is still queued is withdrawn locally without contacting the
  /// remote store. Anything else is deleted remotely first, which needs the
  /// network, and only if the remote store lists it under the acting owner.
  pub async fn remove_record(
    &self,
    ctx: &SyncContext,
    kind: RecordKind,
    id: &RecordId,
  ) -> Result<()> {
    let owner = ctx.owner().ok_or(Error::Unauthenticated)?;

    let mirrored: Vec<Record> = self
      .local
      .get_all(Collection::records(kind))
      .await
      .map_err(Error::local)?;
    if mirrored.iter().any(|record| &record.id == id && !record.is_owned_by(owner)) {
      return Err(Error::NotFound(id.clone()));
    }

    if id.is_local() {
      let queued = self
        .outbox
        .drain(kind)
        .await
        .map_err(Error::local)?
        .into_iter()
        .find(|entry| &entry.id == id && entry.is_owned_by(owner))
        .ok_or_else(|| Error::NotFound(id.clone()))?;

      self.outbox.acknowledge(kind, &queued.id).await.map_err(Error::local)?;
      self
        .local
        .delete(Collection::records(kind), id)
        .await
        .map_err(Error::local)?;
      tracing::info!(%kind, %id, "queued write withdrawn");
      return Ok(());
    }

    if !self.connectivity.is_online() {
      return Err(Error::RemoteUnavailable(RemoteError::Offline));
    }
    // The mirror only holds the owner's last pull, so ownership is checked
    // against the remote store itself.
    let owned = self
      .remote
      .query_by_owner(kind, owner)
      .await
      .map_err(Error::RemoteUnavailable)?;
    if !owned.iter().any(|row| row.id.as_ref() == Some(id)) {
      return Err(Error::NotFound(id.clone()));
    }
    self.remote.delete(kind, id).await.map_err(Error::RemoteUnavailable)?;
    self
      .local
      .delete(Collection::records(kind), id)
      .await
      .map_err(Error::local)?;
    tracing::info!(%kind, %id, "record deleted");
    Ok(())
  }

  /// Delete every record of `kind` the acting owner has, remotely and
  /// locally, including writes still queued. Returns how many remote records
  /// were deleted.
  pub async fn reset_kind(&self, ctx: &SyncContext, kind: RecordKind) -> Result<usize> {
    let owner = ctx.owner().ok_or(Error::Unauthenticated)?;
    if !self.connectivity.is_online() {
      return Err(Error::RemoteUnavailable(RemoteError::Offline));
    }

    let rows = self
      .remote
      .query_by_owner(kind, owner)
      .await
      .map_err(Error::RemoteUnavailable)?;

    let mut deleted = 0;
    for id in rows.into_iter().filter_map(|row| row.id) {
      self.remote.delete(kind, &id).await.map_err(Error::RemoteUnavailable)?;
      deleted += 1;
    }

    for entry in self.pending(ctx, kind).await? {
      self.outbox.acknowledge(kind, &entry.id).await.map_err(Error::local)?;
    }
    self.replace_mirror(kind, &[]).await.map_err(Error::local)?;

    tracing::info!(%kind, deleted, "all records deleted");
    Ok(deleted)
  }
}
