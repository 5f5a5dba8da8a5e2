//! The `CacheStorage` trait: named, versioned caches of request → response
//! pairs used by the request-interception layer.

use std::future::Future;

use bytes::Bytes;

/// A response as persisted in a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
  pub status:  u16,
  pub headers: Vec<(String, String)>,
  pub body:    Bytes,
}

/// Storage for named caches. A cache exists once something is put into it.
pub trait CacheStorage: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Names of every cache that currently holds at least one entry.
  fn cache_names(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Insert or overwrite the entry for `key` in `cache`.
  fn put_entry<'a>(
    &'a self,
    cache: &'a str,
    key: &'a str,
    response: &'a CachedResponse,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn match_entry<'a>(
    &'a self,
    cache: &'a str,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<CachedResponse>, Self::Error>> + Send + 'a;

  /// Drop a whole cache. Returns whether it held anything.
  fn delete_cache<'a>(
    &'a self,
    cache: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
