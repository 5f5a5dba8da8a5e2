//! [`CacheStorage`] over the `cache_entries` table.

use bytes::Bytes;
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use stint_core::cache::{CacheStorage, CachedResponse};

use crate::{
  Error, Result, SqliteStore,
  encode::{decode_headers, decode_status, encode_dt, encode_headers, encode_status},
};

struct RawEntry {
  status:  i64,
  headers: String,
  body:    Vec<u8>,
}

impl RawEntry {
  fn into_response(self) -> Result<CachedResponse> {
    Ok(CachedResponse {
      status:  decode_status(self.status)?,
      headers: decode_headers(&self.headers)?,
      body:    Bytes::from(self.body),
    })
  }
}

impl CacheStorage for SqliteStore {
  type Error = Error;

  async fn cache_names(&self) -> Result<Vec<String>> {
    let names = self
      .connection()
      .await?
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT DISTINCT cache_name FROM cache_entries ORDER BY cache_name")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(names)
  }

  async fn put_entry(&self, cache: &str, key: &str, response: &CachedResponse) -> Result<()> {
    let cache_name  = cache.to_owned();
    let request_key = key.to_owned();
    let status      = encode_status(response.status);
    let headers     = encode_headers(&response.headers)?;
    let body        = response.body.to_vec();
    let stored_at   = encode_dt(Utc::now());

    self
      .connection()
      .await?
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cache_entries (cache_name, request_key, status, headers, body, stored_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(cache_name, request_key) DO UPDATE SET
             status    = excluded.status,
             headers   = excluded.headers,
             body      = excluded.body,
             stored_at = excluded.stored_at",
          rusqlite::params![cache_name, request_key, status, headers, body, stored_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn match_entry(&self, cache: &str, key: &str) -> Result<Option<CachedResponse>> {
    let cache_name  = cache.to_owned();
    let request_key = key.to_owned();

    let raw: Option<RawEntry> = self
      .connection()
      .await?
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT status, headers, body FROM cache_entries
             WHERE cache_name = ?1 AND request_key = ?2",
            rusqlite::params![cache_name, request_key],
            |row| {
              Ok(RawEntry {
                status:  row.get(0)?,
                headers: row.get(1)?,
                body:    row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawEntry::into_response).transpose()
  }

  async fn delete_cache(&self, cache: &str) -> Result<bool> {
    let cache_name = cache.to_owned();

    let removed = self
      .connection()
      .await?
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM cache_entries WHERE cache_name = ?1",
          rusqlite::params![cache_name],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }
}
