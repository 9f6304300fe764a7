//! Typed facade over a storage backend.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use super::traits::{KeyValueStore, Partition};

/// A typed value read back from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
  pub data: T,
  pub cached_at: DateTime<Utc>,
}

/// Cache store shared by every loader.
///
/// Reads are forgiving: a backend failure or a document that no longer
/// deserializes is logged and reported as a miss. Writes propagate their
/// errors so the caller decides whether caching is best-effort.
#[derive(Clone)]
pub struct CacheStore {
  backend: Arc<dyn KeyValueStore>,
}

impl CacheStore {
  pub fn new<S: KeyValueStore + 'static>(backend: S) -> Self {
    Self {
      backend: Arc::new(backend),
    }
  }

  /// Read and deserialize an entry, degrading every failure to `None`.
  pub async fn read<T: DeserializeOwned>(
    &self,
    partition: Partition,
    key: &str,
  ) -> Option<Cached<T>> {
    let cached = match self.backend.get(partition, key).await {
      Ok(Some(cached)) => cached,
      Ok(None) => return None,
      Err(e) => {
        tracing::warn!(%partition, key, error = %e, "cache read failed");
        return None;
      }
    };

    match serde_json::from_value(cached.payload) {
      Ok(data) => Some(Cached {
        data,
        cached_at: cached.cached_at,
      }),
      Err(e) => {
        tracing::warn!(%partition, key, error = %e, "cached entry has an unexpected shape");
        None
      }
    }
  }

  /// Serialize and store an entry, overwriting any previous value.
  pub async fn write<T: Serialize>(
    &self,
    partition: Partition,
    key: &str,
    value: &T,
  ) -> Result<()> {
    let payload = serde_json::to_value(value)
      .map_err(|e| eyre!("Failed to serialize {}/{}: {}", partition, key, e))?;

    self.backend.set(partition, key, &payload).await?;
    tracing::debug!(%partition, key, "cache entry written");
    Ok(())
  }

  pub async fn delete(&self, partition: Partition, key: &str) -> Result<()> {
    self.backend.delete(partition, key).await
  }

  pub async fn clear(&self, partition: Partition) -> Result<()> {
    self.backend.clear(partition).await?;
    tracing::info!(%partition, "cache partition cleared");
    Ok(())
  }

  /// Clear every partition.
  pub async fn clear_all(&self) -> Result<()> {
    for partition in Partition::ALL {
      self.clear(partition).await?;
    }
    Ok(())
  }
}
