//! Offline cache: a partitioned key-value store with pluggable backends.
//!
//! This module is dashboard-agnostic. It provides:
//! - A `KeyValueStore` trait with get/set/clear/delete per partition
//! - SQLite, file, in-memory and no-op backends
//! - A typed `CacheStore` facade where reads degrade to "no cached value"
//!   and writes report their errors

mod file;
mod layer;
mod storage;
mod traits;

pub use file::FileStorage;
pub use layer::{Cached, CacheStore};
pub use storage::{scope_id, MemoryStorage, NoopStorage, SqliteStorage};
pub use traits::{CachedValue, KeyValueStore, Partition};
