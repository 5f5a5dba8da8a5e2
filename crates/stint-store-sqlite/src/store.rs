//! [`SqliteStore`], the SQLite implementation of [`LocalStore`].

use std::{fmt, path::PathBuf, sync::Arc};

use stint_core::{
  record::RecordId,
  store::{Collection, Document, LocalStore},
};
use tokio::sync::OnceCell;

use crate::{Error, Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Location {
  File(PathBuf),
  Memory,
}

impl fmt::Debug for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Location::File(path) => write!(f, "{}", path.display()),
      Location::Memory => f.write_str(":memory:"),
    }
  }
}

struct Inner {
  location: Location,
  conn:     OnceCell<tokio_rusqlite::Connection>,
}

/// A Stint local store backed by a single SQLite file.
///
/// The connection is opened lazily: the first operation opens the file and
/// creates the schema, later operations reuse the same handle. A failed open
/// is not remembered, so the next operation tries again.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct SqliteStore {
  inner: Arc<Inner>,
}

impl SqliteStore {
  /// A store at `path`. No I/O happens until the first operation.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self::with_location(Location::File(path.into()))
  }

  /// A lazily-opened in-memory store.
  pub fn in_memory() -> Self { Self::with_location(Location::Memory) }

  /// Open (or create) a store at `path` and run schema initialisation now.
  pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
    let store = Self::new(path);
    store.connection().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let store = Self::in_memory();
    store.connection().await?;
    Ok(store)
  }

  /// Whether some operation has already opened the connection.
  pub fn is_initialised(&self) -> bool { self.inner.conn.initialized() }

  fn with_location(location: Location) -> Self {
    Self {
      inner: Arc::new(Inner { location, conn: OnceCell::new() }),
    }
  }

  pub(crate) async fn connection(&self) -> Result<&tokio_rusqlite::Connection> {
    self
      .inner
      .conn
      .get_or_try_init(|| async {
        let conn = match &self.inner.location {
          Location::File(path) => tokio_rusqlite::Connection::open(path).await?,
          Location::Memory => tokio_rusqlite::Connection::open_in_memory().await?,
        };
        conn
          .call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
          })
          .await?;
        tracing::debug!(location = ?self.inner.location, "local store initialised");
        Ok::<_, Error>(conn)
      })
      .await
  }
}

// ─── LocalStore impl ─────────────────────────────────────────────────────────

// Table names are interpolated into SQL. They come from `Collection::name`,
// a closed set of static strings, never from caller input.

fn upsert_sql(collection: Collection) -> String {
  format!(
    "INSERT INTO {collection} (id, doc) VALUES (?1, ?2)
     ON CONFLICT(id) DO UPDATE SET doc = excluded.doc"
  )
}

fn encode_doc<D: Document>(doc: &D) -> Result<(String, String)> {
  Ok((doc.id().as_str().to_owned(), serde_json::to_string(doc)?))
}

impl LocalStore for SqliteStore {
  type Error = Error;

  async fn put<D: Document>(&self, collection: Collection, doc: &D) -> Result<()> {
    let (id, json) = encode_doc(doc)?;
    let sql        = upsert_sql(collection);

    self
      .connection()
      .await?
      .call(move |conn| {
        conn.execute(&sql, rusqlite::params![id, json])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_all<D: Document>(&self, collection: Collection) -> Result<Vec<D>> {
    let sql = format!("SELECT doc FROM {collection} ORDER BY rowid");

    let raws: Vec<String> = self
      .connection()
      .await?
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .iter()
      .map(|raw| serde_json::from_str(raw).map_err(Error::from))
      .collect()
  }

  async fn delete(&self, collection: Collection, id: &RecordId) -> Result<()> {
    let sql    = format!("DELETE FROM {collection} WHERE id = ?1");
    let id_str = id.as_str().to_owned();

    self
      .connection()
      .await?
      .call(move |conn| {
        conn.execute(&sql, rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear(&self, collection: Collection) -> Result<()> {
    let sql = format!("DELETE FROM {collection}");

    self
      .connection()
      .await?
      .call(move |conn| {
        conn.execute(&sql, [])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn replace_all<D: Document>(&self, collection: Collection, docs: &[D]) -> Result<()> {
    let rows = docs
      .iter()
      .map(encode_doc)
      .collect::<Result<Vec<_>>>()?;
    let clear_sql  = format!("DELETE FROM {collection}");
    let insert_sql = upsert_sql(collection);

    self
      .connection()
      .await?
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(&clear_sql, [])?;
        {
          let mut stmt = tx.prepare(&insert_sql)?;
          for (id, json) in &rows {
            stmt.execute(rusqlite::params![id, json])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(%collection, count = docs.len(), "collection replaced");
    Ok(())
  }
}
