//! Encoding helpers between Rust values and the plain-text representations
//! stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, written for inspection only. Header lists
//! are compact JSON arrays of `[name, value]` pairs.

use chrono::{DateTime, Utc};

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_headers(headers: &[(String, String)]) -> Result<String> {
  Ok(serde_json::to_string(headers)?)
}

pub fn decode_headers(s: &str) -> Result<Vec<(String, String)>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_status(status: u16) -> i64 { i64::from(status) }

pub fn decode_status(raw: i64) -> Result<u16> {
  u16::try_from(raw).map_err(|_| Error::Corrupt(format!("status out of range: {raw}")))
}
