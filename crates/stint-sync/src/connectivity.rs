//! Online/offline state and the edge-triggered "back online" event.
//!
//! The platform's network signal is fed in through
//! [`Connectivity::set_online`]. Subscribers see one event per offline →
//! online transition, not one per heartbeat.

use std::{sync::Arc, time::Duration};

use stint_core::remote::RemoteStore;
use tokio::{sync::watch, task::JoinHandle};

#[derive(Clone, Debug)]
pub struct Connectivity {
  tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
  pub fn new(online: bool) -> Self {
    let (tx, _rx) = watch::channel(online);
    Self { tx: Arc::new(tx) }
  }

  /// Point-in-time state.
  pub fn is_online(&self) -> bool { *self.tx.borrow() }

  /// Report the platform's current state. Returns whether it changed.
  pub fn set_online(&self, online: bool) -> bool {
    let changed = self.tx.send_if_modified(|current| {
      if *current == online {
        return false;
      }
      *current = online;
      true
    });
    if changed {
      tracing::info!(online, "connectivity changed");
    }
    changed
  }

  /// Listen for offline → online transitions from now on.
  pub fn subscribe(&self) -> OnlineTransitions {
    OnlineTransitions { rx: self.tx.subscribe() }
  }

  /// Poll `remote` every `interval` and feed the outcome into
  /// [`set_online`](Self::set_online).
  pub fn spawn_heartbeat<R>(&self, remote: Arc<R>, interval: Duration) -> JoinHandle<()>
  where
    R: RemoteStore + 'static,
  {
    let connectivity = self.clone();
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        let online = match remote.ping().await {
          Ok(()) => true,
          Err(err) => {
            tracing::debug!(%err, "heartbeat failed");
            false
          }
        };
        connectivity.set_online(online);
      }
    })
  }
}

/// A stream of "back online" events.
pub struct OnlineTransitions {
  rx: watch::Receiver<bool>,
}

impl OnlineTransitions {
  /// Wait for the next offline → online transition. Returns `None` once every
  /// [`Connectivity`] handle is gone.
  pub async fn next(&mut self) -> Option<()> {
    loop {
      self.rx.changed().await.ok()?;
      if *self.rx.borrow_and_update() {
        return Some(());
      }
    }
  }
}
