use serde::{Deserialize, Serialize};

/// Headline KPIs for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAggregate {
  pub total_orders: u64,
  pub total_revenue: f64,
  pub orders_today: u64,
  pub average_order_value: f64,
}

/// One named row of chart values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
  pub name: String,
  pub values: Vec<f64>,
}

/// Labels plus one or more series aligned with them by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
  pub labels: Vec<String>,
  pub series: Vec<NamedSeries>,
}

impl ChartSeries {
  /// A chart with the given series names and no data points.
  pub fn empty(names: &[&str]) -> Self {
    Self {
      labels: Vec::new(),
      series: names
        .iter()
        .map(|name| NamedSeries {
          name: name.to_string(),
          values: Vec::new(),
        })
        .collect(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  /// Every series has exactly one value per label.
  pub fn is_aligned(&self) -> bool {
    self.series.iter().all(|s| s.values.len() == self.labels.len())
  }

  pub fn values(&self, name: &str) -> Option<&[f64]> {
    self
      .series
      .iter()
      .find(|s| s.name == name)
      .map(|s| s.values.as_slice())
  }
}

/// Charts that can be placed on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
  RevenueCogs,
  SalesTrend,
}

impl ChartKind {
  pub const ALL: [ChartKind; 2] = [ChartKind::RevenueCogs, ChartKind::SalesTrend];

  pub fn title(self) -> &'static str {
    match self {
      ChartKind::RevenueCogs => "Revenue vs COGS Chart",
      ChartKind::SalesTrend => "Sales Trend Chart",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_chart_is_aligned() {
    let chart = ChartSeries::empty(&["Revenue", "COGS"]);
    assert!(chart.is_empty());
    assert!(chart.is_aligned());
    assert_eq!(chart.values("COGS"), Some(&[][..]));
  }

  #[test]
  fn test_misaligned_chart() {
    let chart = ChartSeries {
      labels: vec!["a".into(), "b".into()],
      series: vec![NamedSeries {
        name: "x".into(),
        values: vec![1.0],
      }],
    };
    assert!(!chart.is_aligned());
  }

  #[test]
  fn test_aggregate_wire_names() {
    let value = serde_json::to_value(DashboardAggregate::default()).unwrap();
    assert!(value.get("totalOrders").is_some());
    assert!(value.get("averageOrderValue").is_some());
  }
}
