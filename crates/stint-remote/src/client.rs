//! Async HTTP client wrapping the remote store's JSON API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use stint_core::{
  record::{OwnerId, Payload, RecordId, RecordKind},
  remote::{RemoteError, RemoteRecord, RemoteStore},
};

fn default_timeout_secs() -> u64 { 30 }

/// Connection settings for the remote store.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  pub base_url:     String,
  #[serde(default)]
  pub username:     String,
  #[serde(default)]
  pub password:     String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl RemoteConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url:     base_url.into(),
      username:     String::new(),
      password:     String::new(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

/// Async HTTP client for the remote store.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpRemote {
  client: Client,
  config: RemoteConfig,
}

#[derive(Deserialize)]
struct Inserted {
  id: String,
}

impl HttpRemote {
  pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  /// `/api/{kind}/{id}`, with `id` encoded as a single path segment.
  fn record_url(&self, kind: RecordKind, id: &RecordId) -> Result<Url, RemoteError> {
    // A bare dot segment would be dropped and address the collection instead.
    if matches!(id.as_str(), "" | "." | "..") {
      return Err(RemoteError::Rejected {
        status:  400,
        message: format!("invalid record id '{id}'"),
      });
    }
    let base = self.url(&format!("/{kind}"));
    let mut url = Url::parse(&base)
      .map_err(|e| RemoteError::Transport(format!("invalid remote url {base:?}: {e}")))?;
    url
      .path_segments_mut()
      .map_err(|()| RemoteError::Transport(format!("remote url {base:?} cannot carry a path")))?
      .push(id.as_str());
    Ok(url)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }
}

fn transport(err: reqwest::Error) -> RemoteError {
  if err.is_decode() {
    RemoteError::Decode(err.to_string())
  } else {
    RemoteError::Transport(err.to_string())
  }
}

/// Turn a non-2xx response into [`RemoteError::Rejected`].
async fn ensure_success(resp: Response) -> Result<Response, RemoteError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let message = resp.text().await.unwrap_or_default();
  Err(RemoteError::Rejected { status: status.as_u16(), message })
}

impl RemoteStore for HttpRemote {
  /// `POST /api/{kind}`
  async fn insert(
    &self,
    kind: RecordKind,
    owner: &OwnerId,
    payload: &Payload,
  ) -> Result<RecordId, RemoteError> {
    let mut body = payload.semantic().into_map();
    body.insert("owner".to_string(), Value::String(owner.to_string()));

    let resp = self
      .auth(self.client.post(self.url(&format!("/{kind}"))))
      .json(&body)
      .send()
      .await
      .map_err(transport)?;

    let inserted: Inserted = ensure_success(resp).await?.json().await.map_err(transport)?;
    tracing::debug!(%kind, id = %inserted.id, "remote insert confirmed");
    Ok(RecordId::remote(inserted.id))
  }

  /// `GET /api/{kind}?owner=<owner>`
  async fn query_by_owner(
    &self,
    kind: RecordKind,
    owner: &OwnerId,
  ) -> Result<Vec<RemoteRecord>, RemoteError> {
    let resp = self
      .auth(self.client.get(self.url(&format!("/{kind}"))))
      .query(&[("owner", owner.as_str())])
      .send()
      .await
      .map_err(transport)?;

    ensure_success(resp).await?.json().await.map_err(transport)
  }

  /// `DELETE /api/{kind}/{id}`
  async fn delete(&self, kind: RecordKind, id: &RecordId) -> Result<(), RemoteError> {
    let resp = self
      .auth(self.client.delete(self.record_url(kind, id)?))
      .send()
      .await
      .map_err(transport)?;

    ensure_success(resp).await?;
    Ok(())
  }

  /// `GET /api/health`
  async fn ping(&self) -> Result<(), RemoteError> {
    let resp = self
      .auth(self.client.get(self.url("/health")))
      .send()
      .await
      .map_err(transport)?;

    ensure_success(resp).await?;
    Ok(())
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::{
    collections::HashMap,
    sync::{
      Arc, Mutex,
      atomic::{AtomicU64, Ordering},
    },
  };

  use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use serde_json::json;

  use super::*;

  // A throwaway in-process remote store.
  #[derive(Clone, Default)]
  struct Mock {
    rows:      Arc<Mutex<Vec<(String, Value)>>>,
    next_id:   Arc<AtomicU64>,
    last_auth: Arc<Mutex<Option<String>>>,
  }

  async fn insert(
    State(mock): State<Mock>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
  ) -> Response {
    *mock.last_auth.lock().unwrap() = headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .map(str::to_owned);

    if body.get("owner").is_none() {
      return (StatusCode::UNPROCESSABLE_ENTITY, "owner is required").into_response();
    }
    let id = format!("doc{}", mock.next_id.fetch_add(1, Ordering::SeqCst));
    body["id"] = json!(id);
    mock.rows.lock().unwrap().push((kind, body));
    Json(json!({ "id": id })).into_response()
  }

  async fn query(
    State(mock): State<Mock>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
  ) -> Json<Vec<Value>> {
    let owner = params.get("owner").cloned().unwrap_or_default();
    let rows = mock
      .rows
      .lock()
      .unwrap()
      .iter()
      .filter(|(k, row)| *k == kind && row["owner"] == json!(owner))
      .map(|(_, row)| row.clone())
      .collect();
    Json(rows)
  }

  async fn remove(
    State(mock): State<Mock>,
    Path((kind, id)): Path<(String, String)>,
  ) -> StatusCode {
    let mut rows = mock.rows.lock().unwrap();
    let before = rows.len();
    rows.retain(|(k, row)| !(*k == kind && row["id"] == json!(id)));
    if rows.len() == before { StatusCode::NOT_FOUND } else { StatusCode::NO_CONTENT }
  }

  async fn serve(mock: Mock) -> String {
    let app = Router::new()
      .route("/api/health", get(|| async { StatusCode::OK }))
      .route("/api/{kind}", post(insert).get(query))
      .route("/api/{kind}/{id}", delete(remove))
      .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{address}")
  }

  fn alice() -> OwnerId { OwnerId::new("alice") }

  #[tokio::test]
  async fn insert_then_query_by_owner() {
    let base = serve(Mock::default()).await;
    let remote = HttpRemote::new(RemoteConfig::new(base)).unwrap();

    let payload = Payload::new().with("artist", "Mingus").with("title", "Fables");
    let id = remote.insert(RecordKind::Song, &alice(), &payload).await.unwrap();
    assert_eq!(id.as_str(), "doc0");

    remote
      .insert(RecordKind::Song, &OwnerId::new("bob"), &payload)
      .await
      .unwrap();

    let rows = remote.query_by_owner(RecordKind::Song, &alice()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, Some(RecordId::remote("doc0")));
    assert_eq!(rows[0].owner, Some(alice()));
    assert_eq!(rows[0].fields.get("title"), Some(&json!("Fables")));

    let sessions = remote.query_by_owner(RecordKind::Session, &alice()).await.unwrap();
    assert!(sessions.is_empty());
  }

  #[tokio::test]
  async fn insert_never_sends_reserved_keys() {
    let mock = Mock::default();
    let base = serve(mock.clone()).await;
    let remote = HttpRemote::new(RemoteConfig::new(base)).unwrap();

    let payload = Payload::new()
      .with("id", "local_session_1")
      .with("queuedAt", "2026-01-01T00:00:00Z")
      .with("minutes", 25);
    remote.insert(RecordKind::Session, &alice(), &payload).await.unwrap();

    let rows = mock.rows.lock().unwrap();
    let stored = &rows[0].1;
    assert_eq!(stored["id"], json!("doc0"));
    assert!(stored.get("queuedAt").is_none());
    assert_eq!(stored["owner"], json!("alice"));
  }

  #[tokio::test]
  async fn delete_by_id() {
    let base = serve(Mock::default()).await;
    let remote = HttpRemote::new(RemoteConfig::new(base)).unwrap();

    let id = remote
      .insert(RecordKind::Session, &alice(), &Payload::new().with("minutes", 5))
      .await
      .unwrap();
    remote.delete(RecordKind::Session, &id).await.unwrap();

    let rows = remote.query_by_owner(RecordKind::Session, &alice()).await.unwrap();
    assert!(rows.is_empty());

    let err = remote.delete(RecordKind::Session, &id).await.unwrap_err();
    assert!(matches!(err, RemoteError::Rejected { status: 404, .. }));
    assert!(!err.is_transient());
  }

  #[tokio::test]
  async fn delete_keeps_the_id_inside_its_own_path_segment() {
    let base = serve(Mock::default()).await;
    let remote = HttpRemote::new(RemoteConfig::new(base)).unwrap();

    let session = remote
      .insert(RecordKind::Session, &alice(), &Payload::new().with("minutes", 5))
      .await
      .unwrap();
    assert_eq!(session.as_str(), "doc0");

    let err = remote
      .delete(RecordKind::Song, &RecordId::remote("../session/doc0"))
      .await
      .unwrap_err();
    assert!(matches!(err, RemoteError::Rejected { status: 404, .. }), "got {err:?}");

    let err = remote
      .delete(RecordKind::Session, &RecordId::remote(".."))
      .await
      .unwrap_err();
    assert!(matches!(err, RemoteError::Rejected { status: 400, .. }), "got {err:?}");

    let rows = remote.query_by_owner(RecordKind::Session, &alice()).await.unwrap();
    assert_eq!(rows.len(), 1);
  }

  #[tokio::test]
  async fn basic_auth_is_sent_when_configured() {
    let mock = Mock::default();
    let base = serve(mock.clone()).await;
    let mut config = RemoteConfig::new(base);
    config.username = "alice".into();
    config.password = "hunter2".into();
    let remote = HttpRemote::new(config).unwrap();

    remote
      .insert(RecordKind::Song, &alice(), &Payload::new().with("title", "So What"))
      .await
      .unwrap();

    let expected = format!("Basic {}", B64.encode("alice:hunter2"));
    assert_eq!(mock.last_auth.lock().unwrap().as_deref(), Some(expected.as_str()));
  }

  #[tokio::test]
  async fn ping_succeeds_against_live_server() {
    let base = serve(Mock::default()).await;
    let remote = HttpRemote::new(RemoteConfig::new(base)).unwrap();
    remote.ping().await.unwrap();
  }

  #[tokio::test]
  async fn unreachable_server_is_a_transient_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let remote = HttpRemote::new(RemoteConfig::new(format!("http://{address}"))).unwrap();
    let err = remote.ping().await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)), "got {err:?}");
    assert!(err.is_transient());
  }
}
