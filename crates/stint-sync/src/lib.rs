//! Offline-first synchronisation for Stint.
//!
//! [`SyncEngine`] is the only entry point business logic may use. It decides
//! per operation whether to talk to the remote store or to the local outbox,
//! pulls authoritative snapshots into the local mirror, and drains the outbox
//! when [`Connectivity`] reports that the network is back.

pub mod connectivity;
pub mod context;
pub mod engine;
pub mod error;
pub mod outbox;

pub use connectivity::{Connectivity, OnlineTransitions};
pub use context::SyncContext;
pub use engine::{AddOutcome, FailureReason, ReconcileReport, SyncEngine, SyncEntryFailure};
pub use error::{Error, Result};
pub use outbox::Outbox;
