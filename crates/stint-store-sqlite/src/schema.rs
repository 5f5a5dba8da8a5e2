//! SQL schema for the Stint SQLite store.
//!
//! Executed once, by whichever operation first touches the store. There is
//! no migration logic beyond "create if absent"; `user_version` is stamped so
//! a future migration has something to gate on.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// The four document tables correspond one-to-one with
/// [`stint_core::store::Collection::all`].
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Confirmed records and mirrors of remote ones, one table per kind.
CREATE TABLE IF NOT EXISTS records_session (
    id   TEXT PRIMARY KEY,
    doc  TEXT NOT NULL   -- JSON document, id included
);

CREATE TABLE IF NOT EXISTS records_song (
    id   TEXT PRIMARY KEY,
    doc  TEXT NOT NULL
);

-- Pending writes. Rows are inserted and deleted, never updated.
CREATE TABLE IF NOT EXISTS outbox_session (
    id   TEXT PRIMARY KEY,
    doc  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS outbox_song (
    id   TEXT PRIMARY KEY,
    doc  TEXT NOT NULL
);

-- Request-interception cache. A cache is the set of rows sharing a name.
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_name   TEXT NOT NULL,
    request_key  TEXT NOT NULL,
    status       INTEGER NOT NULL,
    headers      TEXT NOT NULL,   -- JSON array of [name, value] pairs
    body         BLOB NOT NULL,
    stored_at    TEXT NOT NULL,   -- RFC 3339 UTC
    PRIMARY KEY (cache_name, request_key)
);

PRAGMA user_version = 1;
";
