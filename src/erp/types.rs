//! Query-side types shared by every `QueryService` implementation.

use serde::ser::{Serialize, SerializeTuple, Serializer};
use serde_json::Value;

/// A raw record as returned by `search_read`: field name to value.
pub type Record = serde_json::Map<String, Value>;

/// One filter condition of a search domain.
///
/// Serialized as the host's domain triple `[field, operator, value]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
  /// `field = value`
  Eq(String, Value),
  /// `field in [values]`
  In(String, Vec<Value>),
  /// `field >= value`
  Ge(String, Value),
}

impl Condition {
  pub fn eq(field: &str, value: impl Into<Value>) -> Self {
    Condition::Eq(field.to_string(), value.into())
  }

  pub fn is_in<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
    Condition::In(
      field.to_string(),
      values.into_iter().map(Into::into).collect(),
    )
  }

  pub fn ge(field: &str, value: impl Into<Value>) -> Self {
    Condition::Ge(field.to_string(), value.into())
  }

  pub fn field(&self) -> &str {
    match self {
      Condition::Eq(f, _) | Condition::In(f, _) | Condition::Ge(f, _) => f,
    }
  }

  pub fn operator(&self) -> &'static str {
    match self {
      Condition::Eq(..) => "=",
      Condition::In(..) => "in",
      Condition::Ge(..) => ">=",
    }
  }
}

impl Serialize for Condition {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut triple = serializer.serialize_tuple(3)?;
    triple.serialize_element(self.field())?;
    triple.serialize_element(self.operator())?;
    match self {
      Condition::Eq(_, v) | Condition::Ge(_, v) => triple.serialize_element(v)?,
      Condition::In(_, vs) => triple.serialize_element(vs)?,
    }
    triple.end()
  }
}

/// Options passed alongside a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
  pub limit: Option<u32>,
}

impl SearchOptions {
  pub fn limit(limit: u32) -> Self {
    Self { limit: Some(limit) }
  }
}
