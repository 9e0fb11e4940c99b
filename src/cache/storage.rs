//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;

use super::traits::CachedResponse;
use crate::db::Database;
use crate::http::Response;

/// Trait for cache storage backends.
///
/// Entries live inside a named generation. Writes to the same key replace the
/// previous entry (last successful write wins).
pub trait CacheStorage: Send + Sync {
  /// Store one response under `key` in `generation`.
  fn put(&self, generation: &str, key: &str, response: &Response) -> Result<()>;

  /// Store several responses in one transaction: all of them or none.
  fn put_all(&self, generation: &str, entries: &[(String, Response)]) -> Result<()>;

  /// Look up the stored response for `key` in `generation`.
  fn match_request(&self, generation: &str, key: &str) -> Result<Option<CachedResponse>>;

  /// Whether `generation` has been registered (installed and activated).
  fn has_generation(&self, generation: &str) -> Result<bool>;

  /// Register `generation` in the registry.
  fn register_generation(&self, generation: &str) -> Result<()>;

  /// All generations known to the store, registered or holding entries.
  fn generations(&self) -> Result<Vec<String>>;

  /// Drop `generation` and every entry in it. Returns the number of entries removed.
  fn delete_generation(&self, generation: &str) -> Result<usize>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteCacheStorage {
  conn: Mutex<Connection>,
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Generation registry
CREATE TABLE IF NOT EXISTS cache_generations (
    name TEXT PRIMARY KEY,
    registered_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored responses, one per (generation, request key)
CREATE TABLE IF NOT EXISTS cache_entries (
    generation TEXT NOT NULL,
    key_hash TEXT NOT NULL,
    request_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (generation, key_hash)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_generation ON cache_entries(generation);
"#;

impl SqliteCacheStorage {
  /// Open the cache tables in the database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    let conn = Database::open(path)?.migrate(CACHE_SCHEMA)?.into_conn();
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  #[allow(dead_code)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Database::open_in_memory()?
      .migrate(CACHE_SCHEMA)?
      .into_conn();
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

/// SHA256 of the request key for stable, fixed-length primary keys.
fn key_hash(key: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(key.as_bytes());
  hex::encode(hasher.finalize())
}

fn insert_entry(conn: &Connection, generation: &str, key: &str, response: &Response) -> Result<()> {
  let headers = serde_json::to_string(&response.headers)
    .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

  conn
    .execute(
      "INSERT OR REPLACE INTO cache_entries
         (generation, key_hash, request_key, status, headers, body, cached_at)
       VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        generation,
        key_hash(key),
        key,
        response.status,
        headers,
        response.body
      ],
    )
    .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

  Ok(())
}

impl CacheStorage for SqliteCacheStorage {
  fn put(&self, generation: &str, key: &str, response: &Response) -> Result<()> {
    let conn = self.lock()?;
    insert_entry(&conn, generation, key, response)
  }

  fn put_all(&self, generation: &str, entries: &[(String, Response)]) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for (key, response) in entries {
      insert_entry(&tx, generation, key, response)?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    Ok(())
  }

  fn match_request(&self, generation: &str, key: &str) -> Result<Option<CachedResponse>> {
    let conn = self.lock()?;

    let row: Option<(u16, String, Vec<u8>, String)> = conn
      .query_row(
        "SELECT status, headers, body, cached_at FROM cache_entries
         WHERE generation = ? AND key_hash = ?",
        params![generation, key_hash(key)],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query cache entry: {}", e))?;

    match row {
      Some((status, headers, body, cached_at)) => {
        let headers: Vec<(String, String)> = serde_json::from_str(&headers)
          .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;
        Ok(Some(CachedResponse {
          response: Response {
            status,
            headers,
            body,
          },
          cached_at: parse_datetime(&cached_at)?,
        }))
      }
      None => Ok(None),
    }
  }

  fn has_generation(&self, generation: &str) -> Result<bool> {
    let conn = self.lock()?;
    let found: Option<String> = conn
      .query_row(
        "SELECT name FROM cache_generations WHERE name = ?",
        params![generation],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query cache generations: {}", e))?;
    Ok(found.is_some())
  }

  fn register_generation(&self, generation: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR IGNORE INTO cache_generations (name) VALUES (?)",
        params![generation],
      )
      .map_err(|e| eyre!("Failed to register cache generation: {}", e))?;
    Ok(())
  }

  fn generations(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare(
        "SELECT name FROM cache_generations
         UNION
         SELECT DISTINCT generation FROM cache_entries
         ORDER BY 1",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to query cache generations: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache generations: {}", e))?;

    Ok(names)
  }

  fn delete_generation(&self, generation: &str) -> Result<usize> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    let removed = tx
      .execute(
        "DELETE FROM cache_entries WHERE generation = ?",
        params![generation],
      )
      .map_err(|e| eyre!("Failed to delete cache entries: {}", e))?;
    tx.execute(
      "DELETE FROM cache_generations WHERE name = ?",
      params![generation],
    )
    .map_err(|e| eyre!("Failed to delete cache generation: {}", e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    Ok(removed)
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
