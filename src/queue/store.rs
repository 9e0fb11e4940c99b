//! Persistence adapter for the action log.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::db::Database;
use crate::todos::types::Action;

/// Key under which the action log is stored.
pub const ACTIONS_KEY: &str = "app.todoActions";

/// Durable home of the action log.
///
/// `get` returns `None` when nothing has ever been stored.
pub trait ActionStore: Send + Sync {
  fn get(&self) -> Result<Option<Vec<Action>>>;

  fn set(&self, actions: &[Action]) -> Result<()>;
}

const KV_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Action log stored as JSON in a SQLite key-value table.
pub struct SqliteActionStore {
  conn: Mutex<Connection>,
}

impl SqliteActionStore {
  pub fn open(path: &Path) -> Result<Self> {
    let conn = Database::open(path)?.migrate(KV_SCHEMA)?.into_conn();
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }
}

impl ActionStore for SqliteActionStore {
  fn get(&self) -> Result<Option<Vec<Action>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let value: Option<String> = conn
      .query_row(
        "SELECT value FROM kv WHERE key = ?",
        params![ACTIONS_KEY],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read action log: {}", e))?;

    value
      .map(|v| serde_json::from_str(&v).map_err(|e| eyre!("Failed to parse action log: {}", e)))
      .transpose()
  }

  fn set(&self, actions: &[Action]) -> Result<()> {
    let value =
      serde_json::to_string(actions).map_err(|e| eyre!("Failed to serialize action log: {}", e))?;

    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    conn
      .execute(
        "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?, ?, datetime('now'))",
        params![ACTIONS_KEY, value],
      )
      .map_err(|e| eyre!("Failed to write action log: {}", e))?;

    Ok(())
  }
}

/// In-memory store, lost on exit.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryActionStore {
  actions: Mutex<Option<Vec<Action>>>,
}

impl MemoryActionStore {
  #[allow(dead_code)]
  pub fn with_actions(actions: Vec<Action>) -> Self {
    Self {
      actions: Mutex::new(Some(actions)),
    }
  }
}

impl ActionStore for MemoryActionStore {
  fn get(&self) -> Result<Option<Vec<Action>>> {
    let actions = self
      .actions
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(actions.clone())
  }

  fn set(&self, actions: &[Action]) -> Result<()> {
    let mut slot = self
      .actions
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *slot = Some(actions.to_vec());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sqlite_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todoq.db");

    let store = SqliteActionStore::open(&path).unwrap();
    assert_eq!(store.get().unwrap(), None);

    let actions = vec![Action::add("buy milk"), Action::Toggle { id: "x".into() }];
    store.set(&actions).unwrap();
    drop(store);

    let reopened = SqliteActionStore::open(&path).unwrap();
    assert_eq!(reopened.get().unwrap(), Some(actions));
  }

  #[test]
  fn test_empty_log_is_distinct_from_absent() {
    let store = MemoryActionStore::default();
    assert_eq!(store.get().unwrap(), None);
    store.set(&[]).unwrap();
    assert_eq!(store.get().unwrap(), Some(Vec::new()));
  }
}
