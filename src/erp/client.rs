use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::{Config, ServerConfig};
use crate::erp::api_types::{RpcParams, RpcRequest, RpcResponse};
use crate::erp::service::QueryService;
use crate::erp::types::{Condition, Record, SearchOptions};

/// JSON-RPC client for the host's external object API.
#[derive(Clone)]
pub struct ErpClient {
  http: reqwest::Client,
  endpoint: Url,
  database: String,
  uid: i64,
  api_key: String,
  next_id: Arc<AtomicU64>,
}

impl ErpClient {
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::get_api_key()?;
    Self::with_credentials(
      &config.server,
      api_key,
      Duration::from_secs(config.connectivity.request_timeout_secs),
    )
  }

  pub fn with_credentials(
    server: &ServerConfig,
    api_key: String,
    timeout: Duration,
  ) -> Result<Self> {
    // Trailing slash so `join` appends instead of replacing the last segment
    let base = if server.url.ends_with('/') {
      server.url.clone()
    } else {
      format!("{}/", server.url)
    };
    let base = Url::parse(&base).map_err(|e| eyre!("Invalid server url {}: {}", server.url, e))?;
    let endpoint = base
      .join("jsonrpc")
      .map_err(|e| eyre!("Invalid server url {}: {}", server.url, e))?;

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      endpoint,
      database: server.database.clone(),
      uid: server.user_id,
      api_key,
      next_id: Arc::new(AtomicU64::new(1)),
    })
  }

  /// The JSON-RPC endpoint requests are posted to.
  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }

  /// Issue one JSON-RPC `call` and unwrap its result.
  async fn call(
    &self,
    service: &'static str,
    method: &'static str,
    args: Vec<Value>,
  ) -> Result<Value> {
    let request = RpcRequest {
      jsonrpc: "2.0",
      method: "call",
      id: self.next_id.fetch_add(1, Ordering::Relaxed),
      params: RpcParams {
        service,
        method,
        args,
      },
    };

    let response = self
      .http
      .post(self.endpoint.clone())
      .json(&request)
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", self.endpoint, e))?
      .error_for_status()
      .map_err(|e| eyre!("Server returned an error: {}", e))?;

    let body: RpcResponse = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse server response: {}", e))?;

    if let Some(error) = body.error {
      return Err(eyre!("Server error: {}", error));
    }

    body
      .result
      .ok_or_else(|| eyre!("Server response had neither result nor error"))
  }

  fn search_read_args(
    &self,
    model: &str,
    domain: &[Condition],
    fields: &[&str],
    options: SearchOptions,
  ) -> Result<Vec<Value>> {
    let domain = serde_json::to_value(domain).map_err(|e| eyre!("Failed to encode domain: {}", e))?;

    let mut kwargs = json!({ "fields": fields });
    if let Some(limit) = options.limit {
      kwargs["limit"] = json!(limit);
    }

    Ok(vec![
      json!(self.database),
      json!(self.uid),
      json!(self.api_key),
      json!(model),
      json!("search_read"),
      json!([domain]),
      kwargs,
    ])
  }
}

#[async_trait]
impl QueryService for ErpClient {
  async fn search_read(
    &self,
    model: &str,
    domain: &[Condition],
    fields: &[&str],
    options: SearchOptions,
  ) -> Result<Vec<Record>> {
    let args = self.search_read_args(model, domain, fields, options)?;
    let started = std::time::Instant::now();

    let result = self.call("object", "execute_kw", args).await?;

    let records: Vec<Record> = serde_json::from_value(result)
      .map_err(|e| eyre!("Unexpected {} search_read result: {}", model, e))?;

    tracing::debug!(
      model,
      count = records.len(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "search_read"
    );

    Ok(records)
  }
}
