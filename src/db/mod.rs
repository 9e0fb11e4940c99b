use color_eyre::{eyre::eyre, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// SQLite connection wrapper shared by the action store and the cache storage.
///
/// Each store opens its own connection and applies its own schema.
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Open or create the database at `path`, creating parent directories.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    Ok(Self { conn })
  }

  /// Private in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Ok(Self { conn })
  }

  /// Default data directory ($XDG_DATA_HOME/todoq).
  pub fn default_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("todoq"))
  }

  /// Apply a schema batch. Schemas use `IF NOT EXISTS` throughout.
  pub fn migrate(self, schema: &str) -> Result<Self> {
    self
      .conn
      .execute_batch(schema)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(self)
  }

  pub fn into_conn(self) -> Connection {
    self.conn
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_open_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("todoq.db");
    Database::open(&path)
      .unwrap()
      .migrate("CREATE TABLE IF NOT EXISTS t (x INTEGER);")
      .unwrap();
    assert!(path.exists());
  }
}
