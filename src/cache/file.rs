//! File-based storage: one JSON document per partition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::traits::{CachedValue, KeyValueStore, Partition};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileEntry {
  payload: Value,
  cached_at: DateTime<Utc>,
}

type PartitionDoc = BTreeMap<String, FileEntry>;

/// Stores each partition as `<dir>/<partition>.json`.
///
/// Every write rewrites the whole partition through a temporary file and a
/// rename, so a crash mid-write leaves the previous document intact.
pub struct FileStorage {
  dir: PathBuf,
  // Serializes read-modify-write cycles within this process
  write_lock: Mutex<()>,
}

impl FileStorage {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self {
      dir: dir.into(),
      write_lock: Mutex::new(()),
    }
  }

  fn path_for(&self, partition: Partition) -> PathBuf {
    self.dir.join(format!("{}.json", partition.name()))
  }

  async fn load(&self, partition: Partition) -> Result<PartitionDoc> {
    let path = self.path_for(partition);
    let bytes = match tokio::fs::read(&path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PartitionDoc::new()),
      Err(e) => return Err(eyre!("Failed to read {}: {}", path.display(), e)),
    };

    serde_json::from_slice(&bytes).map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))
  }

  async fn save(&self, partition: Partition, doc: &PartitionDoc) -> Result<()> {
    tokio::fs::create_dir_all(&self.dir)
      .await
      .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;

    let path = self.path_for(partition);
    let tmp = tmp_path(&path);
    let bytes = serde_json::to_vec_pretty(doc)
      .map_err(|e| eyre!("Failed to serialize {}: {}", partition, e))?;

    tokio::fs::write(&tmp, bytes)
      .await
      .map_err(|e| eyre!("Failed to write {}: {}", tmp.display(), e))?;
    tokio::fs::rename(&tmp, &path)
      .await
      .map_err(|e| eyre!("Failed to replace {}: {}", path.display(), e))?;

    Ok(())
  }
}

fn tmp_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".tmp");
  path.with_file_name(name)
}

#[async_trait]
impl KeyValueStore for FileStorage {
  async fn set(&self, partition: Partition, key: &str, value: &Value) -> Result<()> {
    let _guard = self.write_lock.lock().await;
    let mut doc = self.load(partition).await?;
    doc.insert(
      key.to_string(),
      FileEntry {
        payload: value.clone(),
        cached_at: Utc::now(),
      },
    );
    self.save(partition, &doc).await
  }

  async fn get(&self, partition: Partition, key: &str) -> Result<Option<CachedValue>> {
    let doc = self.load(partition).await?;
    Ok(doc.get(key).map(|entry| CachedValue {
      payload: entry.payload.clone(),
      cached_at: entry.cached_at,
    }))
  }

  async fn clear(&self, partition: Partition) -> Result<()> {
    let _guard = self.write_lock.lock().await;
    self.save(partition, &PartitionDoc::new()).await
  }

  async fn delete(&self, partition: Partition, key: &str) -> Result<()> {
    let _guard = self.write_lock.lock().await;
    let mut doc = self.load(partition).await?;
    if doc.remove(key).is_some() {
      self.save(partition, &doc).await?;
    }
    Ok(())
  }
}
