//! HTTP client for the authoritative Stint remote store.
//!
//! [`HttpRemote`] implements [`stint_core::remote::RemoteStore`] against a
//! flat JSON API:
//!
//! | Method   | Path                       | Notes |
//! |----------|----------------------------|-------|
//! | `POST`   | `/api/{kind}`              | Body: record fields plus `owner`; returns `{"id": …}` |
//! | `GET`    | `/api/{kind}?owner=<id>`   | Owner-scoped records |
//! | `DELETE` | `/api/{kind}/{id}`         | |
//! | `GET`    | `/api/health`              | Heartbeat |

mod client;

pub use client::{HttpRemote, RemoteConfig};
