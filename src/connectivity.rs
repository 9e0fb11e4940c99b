//! Online/offline tracking.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use crate::event::Event;
use crate::http::{Fetch, Request};

/// Connectivity as reported by the host or the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
  Online,
  Offline,
}

/// Decides when a connectivity change should retrigger a sync pass.
#[derive(Debug, Default)]
pub struct ConnectivityTracker {
  went_offline: bool,
}

impl ConnectivityTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a change. Returns `true` when coming back online after having
  /// been offline.
  pub fn observe(&mut self, status: Connectivity) -> bool {
    match status {
      Connectivity::Offline => {
        self.went_offline = true;
        false
      }
      Connectivity::Online => std::mem::take(&mut self.went_offline),
    }
  }
}

/// Turns raw reachability checks into transitions. Starts out online.
#[derive(Debug)]
struct ProbeState {
  last: Connectivity,
}

impl ProbeState {
  fn observe(&mut self, reachable: bool) -> Option<Connectivity> {
    let now = if reachable {
      Connectivity::Online
    } else {
      Connectivity::Offline
    };
    if now == self.last {
      return None;
    }
    self.last = now;
    Some(now)
  }
}

/// Periodically check that `url` answers at all and send transitions as events.
///
/// Any completed response counts as reachable; only transport failures mean
/// offline. `network` must be the raw network fetcher, not the cache.
pub fn spawn_probe(
  network: Arc<dyn Fetch>,
  url: String,
  interval: Duration,
  tx: mpsc::UnboundedSender<Event>,
) {
  tokio::spawn(async move {
    let mut state = ProbeState {
      last: Connectivity::Online,
    };
    let mut ticker = tokio::time::interval(interval);

    loop {
      ticker.tick().await;
      let reachable = network
        .fetch(Request::get(url.clone()))
        .await
        .is_ok();

      if let Some(change) = state.observe(reachable) {
        info!(?change, "connectivity changed");
        if tx.send(Event::Connectivity(change)).is_err() {
          break;
        }
      }
    }
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::Response;
  use async_trait::async_trait;
  use color_eyre::{eyre::eyre, Result};
  use std::sync::atomic::{AtomicBool, Ordering};

  #[test]
  fn test_online_after_offline_triggers_once() {
    let mut tracker = ConnectivityTracker::new();
    assert!(!tracker.observe(Connectivity::Online));
    assert!(!tracker.observe(Connectivity::Offline));
    assert!(!tracker.observe(Connectivity::Offline));
    assert!(tracker.observe(Connectivity::Online));
    assert!(!tracker.observe(Connectivity::Online));
  }

  #[test]
  fn test_probe_state_reports_transitions_only() {
    let mut state = ProbeState {
      last: Connectivity::Online,
    };
    assert_eq!(state.observe(true), None);
    assert_eq!(state.observe(false), Some(Connectivity::Offline));
    assert_eq!(state.observe(false), None);
    assert_eq!(state.observe(true), Some(Connectivity::Online));
  }

  struct Switch(AtomicBool);

  #[async_trait]
  impl Fetch for Switch {
    async fn fetch(&self, _request: Request) -> Result<Response> {
      if self.0.load(Ordering::SeqCst) {
        Ok(Response::new(405, ""))
      } else {
        Err(eyre!("unreachable"))
      }
    }
  }

  #[tokio::test]
  async fn test_probe_emits_offline_then_online() {
    let switch = Arc::new(Switch(AtomicBool::new(false)));
    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_probe(
      switch.clone(),
      "http://api/todos".to_string(),
      Duration::from_millis(5),
      tx,
    );

    assert!(matches!(
      rx.recv().await,
      Some(Event::Connectivity(Connectivity::Offline))
    ));

    switch.0.store(true, Ordering::SeqCst);
    assert!(matches!(
      rx.recv().await,
      Some(Event::Connectivity(Connectivity::Online))
    ));
  }
}
