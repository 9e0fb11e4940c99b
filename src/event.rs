use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::connectivity::Connectivity;
use crate::queue::SyncReport;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// A line typed into the shell
  Input(String),
  /// Standard input reached end of file
  InputClosed,
  /// Connectivity changed
  Connectivity(Connectivity),
  /// A sync pass finished
  SyncComplete(SyncReport),
}

/// Fan-in of every event source the shell reacts to.
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { tx, rx }
  }

  /// Sender for other producers (the connectivity probe).
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Spawn the stdin line reader.
  pub fn read_stdin(&self) {
    let tx = self.tx.clone();

    tokio::spawn(async move {
      let mut lines = BufReader::new(tokio::io::stdin()).lines();
      loop {
        match lines.next_line().await {
          Ok(Some(line)) => {
            if tx.send(Event::Input(line)).is_err() {
              break;
            }
          }
          Ok(None) | Err(_) => {
            let _ = tx.send(Event::InputClosed);
            break;
          }
        }
      }
    });
  }

  /// Forward sync reports from the action queue.
  pub fn forward_sync(&self, mut reports: mpsc::UnboundedReceiver<SyncReport>) {
    let tx = self.tx.clone();

    tokio::spawn(async move {
      while let Some(report) = reports.recv().await {
        if tx.send(Event::SyncComplete(report)).is_err() {
          break;
        }
      }
    });
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
