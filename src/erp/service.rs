use async_trait::async_trait;
use color_eyre::Result;

use super::types::{Condition, Record, SearchOptions};

/// The host application's generic data-query endpoint.
///
/// Implementations return records in the order the host produced them. Only
/// the requested fields are guaranteed to be present (plus `id`).
#[async_trait]
pub trait QueryService: Send + Sync {
  async fn search_read(
    &self,
    model: &str,
    domain: &[Condition],
    fields: &[&str],
    options: SearchOptions,
  ) -> Result<Vec<Record>>;
}
