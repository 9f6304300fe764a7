//! Core traits and types for the caching system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde_json::Value;

/// Named subdivision of the store.
///
/// Dashboard-level aggregates and UI preferences live in `Dashboard`,
/// per-chart series live in `Chart`. Keys are only unique within a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
  Dashboard,
  Chart,
}

impl Partition {
  pub const ALL: [Partition; 2] = [Partition::Dashboard, Partition::Chart];

  /// Stable store name, shared by every backend.
  pub fn name(self) -> &'static str {
    match self {
      Partition::Dashboard => "dashboardData",
      Partition::Chart => "chartData",
    }
  }

  /// SQL table backing this partition.
  pub(crate) fn table(self) -> &'static str {
    match self {
      Partition::Dashboard => "dashboard_data",
      Partition::Chart => "chart_data",
    }
  }
}

impl std::fmt::Display for Partition {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

/// A payload read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
  /// The stored document
  pub payload: Value,
  /// When the document was written
  pub cached_at: DateTime<Utc>,
}

/// Trait for key-value storage backends.
///
/// All operations may fail (storage unavailable, quota exceeded, I/O errors).
/// Backends report failures as-is; deciding whether a failure is fatal is left
/// to [`CacheStore`](super::CacheStore).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  /// Store a document under `key`, overwriting any previous value.
  async fn set(&self, partition: Partition, key: &str, value: &Value) -> Result<()>;

  /// Fetch the document under `key`, if any.
  async fn get(&self, partition: Partition, key: &str) -> Result<Option<CachedValue>>;

  /// Remove every entry of a partition.
  async fn clear(&self, partition: Partition) -> Result<()>;

  /// Remove a single entry. Deleting a missing key is not an error.
  async fn delete(&self, partition: Partition, key: &str) -> Result<()>;
}
