//! Offline action queue with optimistic replay and ordered delivery.
//!
//! The queue keeps every action the user recorded but the server has not yet
//! acknowledged. The displayed list is recomputed from the latest server
//! snapshot plus the pending log, and a sync pass delivers the log to the
//! server front to back, stopping at the first failure.

mod replay;
mod store;

pub use replay::replay;
pub use store::{ActionStore, MemoryActionStore, SqliteActionStore};

use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::todos::client::RemoteTodoService;
use crate::todos::types::{Action, Todo};

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
  /// Remote calls issued in this pass
  pub attempted: usize,
  /// Actions acknowledged and removed from the log
  pub acknowledged: usize,
  /// Actions still pending after the pass
  pub remaining: usize,
}

impl SyncReport {
  pub fn is_settled(&self) -> bool {
    self.remaining == 0
  }
}

struct Inner {
  log: Mutex<Vec<Action>>,
  store: Box<dyn ActionStore>,
  remote: Arc<dyn RemoteTodoService>,
  observers: Mutex<Vec<mpsc::UnboundedSender<SyncReport>>>,
  /// Set once the persisted log has been merged into `log`
  loaded: AtomicBool,
  /// Held for the duration of a sync pass so passes never overlap
  pass: tokio::sync::Mutex<()>,
}

/// Action queue and reconciler. Cheap to clone; clones share one log.
#[derive(Clone)]
pub struct ActionQueue {
  inner: Arc<Inner>,
}

impl ActionQueue {
  pub fn new(store: impl ActionStore + 'static, remote: Arc<dyn RemoteTodoService>) -> Self {
    Self {
      inner: Arc::new(Inner {
        log: Mutex::new(Vec::new()),
        store: Box::new(store),
        remote,
        observers: Mutex::new(Vec::new()),
        loaded: AtomicBool::new(false),
        pass: tokio::sync::Mutex::new(()),
      }),
    }
  }

  /// Receive a report after every sync pass, whatever its outcome.
  pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SyncReport> {
    let (tx, rx) = mpsc::unbounded_channel();
    if let Ok(mut observers) = self.inner.observers.lock() {
      observers.push(tx);
    }
    rx
  }

  /// Load the persisted log, then run a full sync pass.
  pub async fn start(&self) -> Result<SyncReport> {
    self.load()?;
    self.sync().await
  }

  /// Put the persisted log in front of anything dispatched so far.
  ///
  /// Only the first call reads the store; after that the in-memory log is
  /// the authority and later calls load nothing. Returns the number of
  /// actions loaded.
  pub fn load(&self) -> Result<usize> {
    let mut log = self.lock_log()?;
    if self.inner.loaded.load(Ordering::SeqCst) {
      return Ok(0);
    }

    let persisted = self.inner.store.get()?.unwrap_or_default();
    let loaded = persisted.len();
    info!(pending = loaded, "loaded action log");

    let dispatched = std::mem::replace(&mut *log, persisted);
    log.extend(dispatched);
    self.inner.loaded.store(true, Ordering::SeqCst);
    Ok(loaded)
  }

  /// Record an action and kick off a sync pass in the background.
  ///
  /// The action is part of the log, and of every later `derive`, as soon as
  /// this returns.
  pub fn dispatch(&self, action: Action) -> JoinHandle<Result<SyncReport>> {
    info!(kind = action.kind(), id = action.id(), "dispatched action");
    match self.inner.log.lock() {
      Ok(mut log) => log.push(action),
      Err(e) => {
        let message = format!("Lock poisoned: {}", e);
        return tokio::spawn(async move { Err(eyre!(message)) });
      }
    }

    let queue = self.clone();
    tokio::spawn(async move {
      let result = queue.sync().await;
      if let Err(e) = &result {
        error!("sync pass failed: {}", e);
      }
      result
    })
  }

  /// Actions not yet acknowledged, in log order.
  pub fn pending(&self) -> Vec<Action> {
    self
      .inner
      .log
      .lock()
      .map(|log| log.clone())
      .unwrap_or_default()
  }

  /// Current effective view: server snapshot with the pending log replayed on top.
  pub async fn derive(&self) -> Result<Vec<Todo>> {
    let snapshot = self.inner.remote.list_all().await?;
    let pending = self.pending();
    Ok(replay(snapshot, &pending))
  }

  /// Deliver pending actions in order until one fails, then drop the
  /// acknowledged prefix and persist the rest.
  pub async fn sync(&self) -> Result<SyncReport> {
    let _pass = self.inner.pass.lock().await;
    // The store must be merged before this pass overwrites it
    self.load()?;

    let pending = self.pending();
    let mut attempted = 0;
    let mut acknowledged = 0;

    for action in &pending {
      attempted += 1;
      if !self.inner.remote.apply(action).await {
        warn!(
          kind = action.kind(),
          id = action.id(),
          "remote rejected action, halting sync pass"
        );
        break;
      }
      acknowledged += 1;
    }

    let remaining = {
      let mut log = self.lock_log()?;
      log.drain(..acknowledged);
      self.inner.store.set(&log)?;
      log.len()
    };

    let report = SyncReport {
      attempted,
      acknowledged,
      remaining,
    };
    info!(attempted, acknowledged, remaining, "sync pass complete");
    self.notify(report);

    Ok(report)
  }

  fn notify(&self, report: SyncReport) {
    if let Ok(mut observers) = self.inner.observers.lock() {
      observers.retain(|tx| tx.send(report).is_ok());
    }
  }

  fn lock_log(&self) -> Result<std::sync::MutexGuard<'_, Vec<Action>>> {
    self
      .inner
      .log
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}
