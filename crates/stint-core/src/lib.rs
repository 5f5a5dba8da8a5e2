//! Core types and trait definitions for the Stint offline sync layer.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend, the remote client, the orchestrator and the request cache
//! all depend on it; it depends on nothing of theirs.

pub mod cache;
pub mod error;
pub mod record;
pub mod remote;
pub mod store;

pub use error::{Error, Result};
