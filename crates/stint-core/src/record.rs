//! Records, identifiers and outbox entries.
//!
//! A record id carries its provenance in its prefix: ids minted on this
//! device start with `local_` until the remote store confirms the write and
//! hands back an id of its own. No separate "dirty" flag is kept.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// The two record kinds the remote store knows about.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
  /// A logged practice session.
  Session,
  /// A saved song.
  Song,
}

impl RecordKind {
  pub const ALL: [RecordKind; 2] = [RecordKind::Session, RecordKind::Song];
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// The identity that scopes a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OwnerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Record ids ──────────────────────────────────────────────────────────────

const LOCAL_PREFIX: &str = "local_";
const CLOUD_PREFIX: &str = "cloud_";

/// Where a [`RecordId`] was minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  /// Minted on this device and never confirmed by the remote store.
  Local,
  /// Assigned by the remote store and mirrored locally.
  Remote,
}

/// A record identifier, unique within its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
  /// Mint a provisional id for a write the remote store has not seen.
  pub fn mint_local(kind: RecordKind) -> Self {
    Self(format!("{LOCAL_PREFIX}{kind}_{}", Uuid::new_v4()))
  }

  /// Mint a placeholder for a pulled remote record that arrived without one.
  /// The result is remote-origin: the record is a mirror, not pending work.
  pub fn mint_cloud(kind: RecordKind) -> Self {
    Self(format!("{CLOUD_PREFIX}{kind}_{}", Uuid::new_v4()))
  }

  /// Wrap an id handed back by the remote store.
  pub fn remote(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn origin(&self) -> Origin {
    if self.0.starts_with(LOCAL_PREFIX) { Origin::Local } else { Origin::Remote }
  }

  pub fn is_local(&self) -> bool { self.origin() == Origin::Local }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<String> for RecordId {
  fn from(id: String) -> Self { Self(id) }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// Keys owned by the sync layer rather than by the record's semantics.
pub const RESERVED_KEYS: [&str; 3] = ["id", "owner", "queuedAt"];

/// Free-form semantic fields of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
  pub fn new() -> Self { Self::default() }

  /// Accept any JSON object; anything else is rejected.
  pub fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Object(map) => Ok(Self(map)),
      Value::Null => Err(Error::InvalidPayload("null")),
      Value::Bool(_) => Err(Error::InvalidPayload("a boolean")),
      Value::Number(_) => Err(Error::InvalidPayload("a number")),
      Value::String(_) => Err(Error::InvalidPayload("a string")),
      Value::Array(_) => Err(Error::InvalidPayload("an array")),
    }
  }

  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.0.insert(key.into(), value.into());
    self
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.0.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// The payload without any sync-layer bookkeeping keys.
  pub fn semantic(&self) -> Payload {
    let mut map = self.0.clone();
    for key in RESERVED_KEYS {
      map.remove(key);
    }
    Payload(map)
  }

  pub fn into_map(self) -> Map<String, Value> { self.0 }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A unit of domain data held in a `records_<kind>` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub id:     RecordId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub owner:  Option<OwnerId>,
  #[serde(flatten)]
  pub fields: Payload,
}

impl Record {
  pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
    self.owner.as_ref() == Some(owner)
  }
}

// ─── Outbox entry ────────────────────────────────────────────────────────────

/// A write waiting for confirmation by the remote store.
///
/// Created when a write cannot reach the remote store, destroyed once the
/// remote store confirms the equivalent write. Never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
  pub id:        RecordId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub owner:     Option<OwnerId>,
  #[serde(rename = "queuedAt")]
  pub queued_at: DateTime<Utc>,
  #[serde(flatten)]
  pub fields:    Payload,
}

impl OutboxEntry {
  pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
    self.owner.as_ref() == Some(owner)
  }

  /// The fields to send to the remote store. The provisional id is not one
  /// of them; the remote store mints its own.
  pub fn payload(&self) -> Payload { self.fields.semantic() }

  /// The local mirror record this entry stands for.
  pub fn to_record(&self) -> Record {
    Record {
      id:     self.id.clone(),
      owner:  self.owner.clone(),
      fields: self.fields.semantic(),
    }
  }
}
