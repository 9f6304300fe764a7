//! Online/offline signal with change notifications.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone, Copy)]
struct Inputs {
  /// Last observed reachability
  reachable: bool,
  /// User asked to work offline
  forced_offline: bool,
}

impl Inputs {
  fn online(self) -> bool {
    self.reachable && !self.forced_offline
  }
}

/// Shared connectivity signal.
///
/// The effective state is "reachable and not forced offline". Subscribers
/// are only woken when the effective state actually flips.
#[derive(Clone)]
pub struct ConnectivityMonitor {
  inputs: Arc<Mutex<Inputs>>,
  tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
  pub fn new(reachable: bool) -> Self {
    let inputs = Inputs {
      reachable,
      forced_offline: false,
    };
    let (tx, _rx) = watch::channel(inputs.online());
    Self {
      inputs: Arc::new(Mutex::new(inputs)),
      tx: Arc::new(tx),
    }
  }

  pub fn is_online(&self) -> bool {
    *self.tx.borrow()
  }

  pub fn is_forced_offline(&self) -> bool {
    match self.inputs.lock() {
      Ok(inputs) => inputs.forced_offline,
      Err(poisoned) => poisoned.into_inner().forced_offline,
    }
  }

  pub fn subscribe(&self) -> watch::Receiver<bool> {
    self.tx.subscribe()
  }

  /// Record an observed reachability change (reachability check or injected signal).
  pub fn set_online(&self, reachable: bool) {
    self.update(|inputs| inputs.reachable = reachable);
  }

  /// Force the dashboard offline regardless of reachability.
  pub fn set_forced_offline(&self, forced: bool) {
    self.update(|inputs| inputs.forced_offline = forced);
  }

  fn update(&self, f: impl FnOnce(&mut Inputs)) {
    let mut inputs = match self.inputs.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    f(&mut inputs);
    let online = inputs.online();

    self.tx.send_if_modified(|current| {
      if *current == online {
        false
      } else {
        tracing::info!(online, "connectivity changed");
        *current = online;
        true
      }
    });
  }

  /// Periodically check that the server answers HTTP at all.
  ///
  /// Any HTTP response counts as reachable; connection errors and timeouts
  /// count as unreachable.
  pub fn spawn_checker(&self, url: Url, interval: Duration, timeout: Duration) -> JoinHandle<()> {
    let monitor = self.clone();

    tokio::spawn(async move {
      let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
          tracing::error!(error = %e, "could not build client, reachability checks disabled");
          return;
        }
      };

      let mut ticker = tokio::time::interval(interval);
      loop {
        ticker.tick().await;
        let reachable = match client.head(url.clone()).send().await {
          Ok(_) => true,
          Err(e) => {
            tracing::debug!(error = %e, "server unreachable");
            false
          }
        };
        monitor.set_online(reachable);
      }
    })
  }
}
