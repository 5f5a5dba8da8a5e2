//! Request-interception cache for Stint.
//!
//! Sits between the application and the network. Each request is routed to
//! one of four policies:
//!
//! | Match | Policy |
//! |-------|--------|
//! | non-`GET`, non-HTTP, `/ws`, dev hosts | passthrough |
//! | remote data API | network only, `503 {"error":"offline"}` on failure |
//! | remote client library | network first, cache refreshed on success |
//! | shared fonts and icons | cache first |
//! | everything else | network first, `200`s cached, document fallback |
//!
//! Cached responses live in one versioned cache (`<prefix>-v<version>`);
//! bumping the version and activating is the only invalidation.

pub mod config;
pub mod error;
pub mod fetch;
pub mod interceptor;
pub mod proxy;
pub mod request;
pub mod route;

pub use config::{CacheConfig, ProxyConfig, RoutesConfig};
pub use error::{Error, Result};
pub use fetch::{Fetch, FetchError, HttpFetcher};
pub use interceptor::{InstallReport, Interceptor, Outcome};
pub use request::{AssetRequest, AssetResponse};
pub use route::{Policy, RouteTable};
