//! Storage backends: SQLite, in-memory, and a no-op backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::OnceCell;

use super::traits::{CachedValue, KeyValueStore, Partition};

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

#[async_trait]
impl KeyValueStore for NoopStorage {
  async fn set(&self, _partition: Partition, _key: &str, _value: &Value) -> Result<()> {
    Ok(()) // Discard
  }

  async fn get(&self, _partition: Partition, _key: &str) -> Result<Option<CachedValue>> {
    Ok(None) // Always miss
  }

  async fn clear(&self, _partition: Partition) -> Result<()> {
    Ok(())
  }

  async fn delete(&self, _partition: Partition, _key: &str) -> Result<()> {
    Ok(())
  }
}

/// Process-local storage. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<(Partition, String), CachedValue>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(Partition, String), CachedValue>>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
  async fn set(&self, partition: Partition, key: &str, value: &Value) -> Result<()> {
    self.lock()?.insert(
      (partition, key.to_string()),
      CachedValue {
        payload: value.clone(),
        cached_at: Utc::now(),
      },
    );
    Ok(())
  }

  async fn get(&self, partition: Partition, key: &str) -> Result<Option<CachedValue>> {
    Ok(self.lock()?.get(&(partition, key.to_string())).cloned())
  }

  async fn clear(&self, partition: Partition) -> Result<()> {
    self.lock()?.retain(|(p, _), _| *p != partition);
    Ok(())
  }

  async fn delete(&self, partition: Partition, key: &str) -> Result<()> {
    self.lock()?.remove(&(partition, key.to_string()));
    Ok(())
  }
}

/// Schema steps, applied in order. Step `n` brings the database to
/// `user_version = n + 1`. Steps only ever create what is missing.
const MIGRATIONS: &[&str] = &[
  // 1: dashboard partition
  r#"
CREATE TABLE IF NOT EXISTS dashboard_data (
    key TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
  // 2: chart partition
  r#"
CREATE TABLE IF NOT EXISTS chart_data (
    key TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
];

/// Current schema version.
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

#[derive(Debug, Clone)]
enum Location {
  File(PathBuf),
  Memory,
}

/// SQLite-based cache storage implementation.
///
/// The database is opened (and migrated) on first access, so constructing a
/// `SqliteStorage` never touches the filesystem.
pub struct SqliteStorage {
  location: Location,
  conn: OnceCell<Mutex<Connection>>,
}

impl SqliteStorage {
  /// Storage at an explicit path.
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self {
      location: Location::File(path.into()),
      conn: OnceCell::new(),
    }
  }

  /// Storage backed by a private in-memory database.
  pub fn in_memory() -> Self {
    Self {
      location: Location::Memory,
      conn: OnceCell::new(),
    }
  }

  /// Default database path for a given cache scope.
  pub fn default_path(scope: &str) -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(
      data_dir
        .join("saledash")
        .join(format!("cache-{}.db", scope)),
    )
  }

  async fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    let conn = self
      .conn
      .get_or_try_init(|| async { self.open().map(Mutex::new) })
      .await?;

    conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn open(&self) -> Result<Connection> {
    let conn = match &self.location {
      Location::File(path) => {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
          std::fs::create_dir_all(parent)
            .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
        }
        Connection::open(path)
          .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?
      }
      Location::Memory => Connection::open_in_memory()
        .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?,
    };

    run_migrations(&conn)?;
    tracing::debug!(location = ?self.location, "cache database opened");

    Ok(conn)
  }
}

/// Bring the schema up to [`SCHEMA_VERSION`].
fn run_migrations(conn: &Connection) -> Result<()> {
  let current: i64 = conn
    .query_row("PRAGMA user_version", [], |row| row.get(0))
    .map_err(|e| eyre!("Failed to read schema version: {}", e))?;

  for (idx, step) in MIGRATIONS.iter().enumerate() {
    let version = idx as i64 + 1;
    if version <= current {
      continue;
    }

    conn
      .execute_batch(&format!(
        "BEGIN TRANSACTION;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
        step, version
      ))
      .map_err(|e| eyre!("Failed to run cache migration {}: {}", version, e))?;
    tracing::info!(version, "cache schema upgraded");
  }

  Ok(())
}

#[async_trait]
impl KeyValueStore for SqliteStorage {
  async fn set(&self, partition: Partition, key: &str, value: &Value) -> Result<()> {
    let data = serde_json::to_vec(value).map_err(|e| eyre!("Failed to serialize entry: {}", e))?;
    let conn = self.conn().await?;

    conn
      .execute(
        &format!(
          "INSERT OR REPLACE INTO {} (key, data, cached_at) VALUES (?, ?, datetime('now'))",
          partition.table()
        ),
        params![key, data],
      )
      .map_err(|e| eyre!("Failed to store {}/{}: {}", partition, key, e))?;

    Ok(())
  }

  async fn get(&self, partition: Partition, key: &str) -> Result<Option<CachedValue>> {
    let conn = self.conn().await?;

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        &format!(
          "SELECT data, cached_at FROM {} WHERE key = ?",
          partition.table()
        ),
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {}/{}: {}", partition, key, e))?;

    match row {
      Some((data, cached_at_str)) => {
        let payload: Value = serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize {}/{}: {}", partition, key, e))?;
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CachedValue { payload, cached_at }))
      }
      None => Ok(None),
    }
  }

  async fn clear(&self, partition: Partition) -> Result<()> {
    let conn = self.conn().await?;

    conn
      .execute(&format!("DELETE FROM {}", partition.table()), [])
      .map_err(|e| eyre!("Failed to clear {}: {}", partition, e))?;

    Ok(())
  }

  async fn delete(&self, partition: Partition, key: &str) -> Result<()> {
    let conn = self.conn().await?;

    conn
      .execute(
        &format!("DELETE FROM {} WHERE key = ?", partition.table()),
        params![key],
      )
      .map_err(|e| eyre!("Failed to delete {}/{}: {}", partition, key, e))?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

/// Short, stable identifier for a cache scope (server, database, user).
///
/// Used in file names so caches for different servers or users never mix.
pub fn scope_id(parts: &[&str]) -> String {
  let mut hasher = Sha256::new();
  for part in parts {
    hasher.update(part.trim().to_lowercase().as_bytes());
    hasher.update([0u8]);
  }
  let digest = hex::encode(hasher.finalize());
  digest[..16].to_string()
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use serde_json::json;
  use std::path::Path;

  fn schema_version_at(path: &Path) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn
      .query_row("PRAGMA user_version", [], |row| row.get(0))
      .unwrap()
  }

  #[tokio::test]
  async fn test_sqlite_set_get_overwrite() {
    let storage = SqliteStorage::in_memory();

    storage
      .set(Partition::Chart, "sales_trend", &json!({"labels": ["a"]}))
      .await
      .unwrap();
    storage
      .set(Partition::Chart, "sales_trend", &json!({"labels": ["b"]}))
      .await
      .unwrap();

    let cached = storage.get(Partition::Chart, "sales_trend").await.unwrap();
    assert_eq!(cached.unwrap().payload, json!({"labels": ["b"]}));
  }

  #[tokio::test]
  async fn test_sqlite_partitions_are_isolated() {
    let storage = SqliteStorage::in_memory();

    storage
      .set(Partition::Dashboard, "main", &json!(1))
      .await
      .unwrap();

    assert!(storage.get(Partition::Chart, "main").await.unwrap().is_none());
    assert!(storage
      .get(Partition::Dashboard, "main")
      .await
      .unwrap()
      .is_some());
  }

  #[tokio::test]
  async fn test_sqlite_clear_and_delete() {
    let storage = SqliteStorage::in_memory();
    storage.set(Partition::Chart, "a", &json!(1)).await.unwrap();
    storage.set(Partition::Chart, "b", &json!(2)).await.unwrap();
    storage
      .set(Partition::Dashboard, "a", &json!(3))
      .await
      .unwrap();

    storage.delete(Partition::Chart, "a").await.unwrap();
    assert!(storage.get(Partition::Chart, "a").await.unwrap().is_none());
    assert!(storage.get(Partition::Chart, "b").await.unwrap().is_some());

    // Deleting a missing key is fine
    storage.delete(Partition::Chart, "missing").await.unwrap();

    storage.clear(Partition::Chart).await.unwrap();
    assert!(storage.get(Partition::Chart, "b").await.unwrap().is_none());
    assert!(storage
      .get(Partition::Dashboard, "a")
      .await
      .unwrap()
      .is_some());
  }

  #[tokio::test]
  async fn test_sqlite_upgrade_keeps_existing_partition() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    // A database left behind by a version 1 schema
    {
      let conn = Connection::open(&path).unwrap();
      conn
        .execute_batch(&format!("{}\nPRAGMA user_version = 1;", MIGRATIONS[0]))
        .unwrap();
      conn
        .execute(
          "INSERT INTO dashboard_data (key, data) VALUES ('main', ?)",
          params![br#"{"totalOrders":3}"#.to_vec()],
        )
        .unwrap();
    }

    let storage = SqliteStorage::at(&path);
    let cached = storage.get(Partition::Dashboard, "main").await.unwrap();
    assert_eq!(cached.unwrap().payload, json!({"totalOrders": 3}));

    storage
      .set(Partition::Chart, "sales_trend", &json!([]))
      .await
      .unwrap();
    drop(storage);

    assert_eq!(schema_version_at(&path), SCHEMA_VERSION);
  }

  #[tokio::test]
  async fn test_sqlite_reopen_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    let storage = SqliteStorage::at(&path);
    storage
      .set(Partition::Dashboard, "main", &json!({"x": 1}))
      .await
      .unwrap();
    drop(storage);

    let storage = SqliteStorage::at(&path);
    let cached = storage.get(Partition::Dashboard, "main").await.unwrap();
    assert_eq!(cached.unwrap().payload, json!({"x": 1}));
  }

  /// Fractions whose shortest decimal form needs all 17 significant digits
  pub(crate) fn awkward_floats() -> Vec<f64> {
    (1..2000)
      .map(|i| f64::from(i) / 7.0 + f64::from(i) / 1050.0)
      .chain([350.0 / 3.0, 0.9990476190476191, 0.1 + 0.2, 1e-7 / 3.0])
      .collect()
  }

  #[tokio::test]
  async fn test_sqlite_floats_read_back_exactly() {
    let storage = SqliteStorage::in_memory();
    let values = awkward_floats();

    storage
      .set(Partition::Dashboard, "main", &json!(values))
      .await
      .unwrap();

    let payload = storage
      .get(Partition::Dashboard, "main")
      .await
      .unwrap()
      .unwrap()
      .payload;
    let read: Vec<f64> = serde_json::from_value(payload).unwrap();
    assert_eq!(read, values);
  }

  #[tokio::test]
  async fn test_memory_storage() {
    let storage = MemoryStorage::new();
    storage.set(Partition::Chart, "k", &json!("v")).await.unwrap();
    storage
      .set(Partition::Dashboard, "k", &json!("w"))
      .await
      .unwrap();

    storage.clear(Partition::Chart).await.unwrap();
    assert!(storage.get(Partition::Chart, "k").await.unwrap().is_none());
    assert_eq!(
      storage
        .get(Partition::Dashboard, "k")
        .await
        .unwrap()
        .unwrap()
        .payload,
      json!("w")
    );
  }

  #[tokio::test]
  async fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    storage.set(Partition::Chart, "k", &json!(1)).await.unwrap();
    assert!(storage.get(Partition::Chart, "k").await.unwrap().is_none());
  }

  #[test]
  fn test_scope_id_is_stable_and_distinct() {
    let a = scope_id(&["https://erp.example.com", "prod", "7"]);
    let b = scope_id(&["https://ERP.example.com ", "prod", "7"]);
    let c = scope_id(&["https://erp.example.com", "prod", "8"]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 16);
  }
}
