//! Serde types matching the host's JSON-RPC payloads and record shapes.
//!
//! These types are separate from dashboard types to allow clean
//! deserialization while keeping domain types focused on application needs.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::types::Record;

/// Convert a raw record into one of the typed rows below.
pub fn from_record<T: DeserializeOwned>(record: &Record) -> serde_json::Result<T> {
  serde_json::from_value(Value::Object(record.clone()))
}

// ============================================================================
// JSON-RPC envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RpcRequest {
  pub jsonrpc: &'static str,
  pub method: &'static str,
  pub id: u64,
  pub params: RpcParams,
}

#[derive(Debug, Serialize)]
pub struct RpcParams {
  pub service: &'static str,
  pub method: &'static str,
  pub args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
  #[serde(default)]
  pub result: Option<Value>,
  #[serde(default)]
  pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
  #[serde(default)]
  pub code: i64,
  #[serde(default)]
  pub message: String,
  pub data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorData {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub message: String,
}

impl std::fmt::Display for RpcError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.data {
      Some(data) if !data.message.is_empty() => {
        write!(f, "{} ({}): {}", self.message, data.name, data.message)
      }
      _ => write!(f, "{} (code {})", self.message, self.code),
    }
  }
}

// ============================================================================
// Field helpers
// ============================================================================

/// A many2one reference: `[id, display_name]` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Many2One {
  pub id: i64,
  pub name: String,
}

/// The host sends `false` for unset relational and text fields.
#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeFalse<T> {
  Value(T),
  False(#[allow(dead_code)] bool),
}

impl<T> MaybeFalse<T> {
  fn into_option(self) -> Option<T> {
    match self {
      MaybeFalse::Value(v) => Some(v),
      MaybeFalse::False(_) => None,
    }
  }
}

fn many2one<'de, D>(deserializer: D) -> Result<Option<Many2One>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<MaybeFalse<(i64, String)>> = Option::deserialize(deserializer)?;
  Ok(
    raw
      .and_then(MaybeFalse::into_option)
      .map(|(id, name)| Many2One { id, name }),
  )
}

fn false_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  let raw: Option<MaybeFalse<T>> = Option::deserialize(deserializer)?;
  Ok(raw.and_then(MaybeFalse::into_option))
}

// ============================================================================
// Record shapes
// ============================================================================

/// `sale.order` with `amount_total` and (optionally) `date_order`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSaleOrder {
  #[serde(default)]
  pub amount_total: f64,
  /// UTC, `YYYY-MM-DD HH:MM:SS`
  #[serde(default, deserialize_with = "false_as_none")]
  pub date_order: Option<String>,
}

/// `sale.order.line` with product, subtotal, quantity and unit price.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiOrderLine {
  #[serde(default, deserialize_with = "many2one")]
  pub product_id: Option<Many2One>,
  #[serde(default)]
  pub price_subtotal: f64,
  #[serde(default)]
  pub product_uom_qty: f64,
  #[serde(default)]
  pub price_unit: f64,
}

/// `product.product` with category and cost.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProduct {
  pub id: i64,
  #[serde(default, deserialize_with = "many2one")]
  pub categ_id: Option<Many2One>,
  #[serde(default)]
  pub standard_price: f64,
}
