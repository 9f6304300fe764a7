//! The three datasets shown on the dashboard and how each is fetched.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;

use super::transform;
use super::types::{ChartSeries, DashboardAggregate};
use crate::cache::Partition;
use crate::erp::api_types::{from_record, ApiOrderLine, ApiProduct, ApiSaleOrder};
use crate::erp::{Condition, QueryService, Record, SearchOptions};

/// Order states that count as a sale.
const CONFIRMED_STATES: [&str; 2] = ["sale", "done"];

/// Who and what a load is scoped to.
#[derive(Debug, Clone)]
pub struct QueryScope {
  pub user_id: i64,
  pub lookback_days: u32,
  pub limit: u32,
  /// Reference time for the lookback window and "today"
  pub now: DateTime<Local>,
}

impl QueryScope {
  fn options(&self) -> SearchOptions {
    SearchOptions::limit(self.limit)
  }

  /// Confirmed orders of the current user inside the lookback window.
  ///
  /// `prefix` addresses the order through a relation, e.g. `order_id.`.
  fn order_domain(&self, prefix: &str) -> Vec<Condition> {
    vec![
      Condition::is_in(&format!("{}state", prefix), CONFIRMED_STATES),
      Condition::eq(&format!("{}user_id", prefix), self.user_id),
      Condition::ge(
        &format!("{}date_order", prefix),
        transform::window_start(&self.now, self.lookback_days),
      ),
    ]
  }
}

/// Decode raw records into typed rows.
fn parse_records<T: DeserializeOwned>(model: &str, records: &[Record]) -> Result<Vec<T>> {
  records
    .iter()
    .map(|r| from_record(r).map_err(|e| eyre!("Unexpected {} record: {}", model, e)))
    .collect()
}

/// One independently loaded and cached unit of dashboard data.
#[async_trait]
pub trait Dataset: Send + Sync + 'static {
  type Output: Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync + 'static;

  /// Cache key within [`Dataset::PARTITION`]
  const KEY: &'static str;
  const PARTITION: Partition;
  /// Human name used in notifications
  const LABEL: &'static str;

  /// Query the remote service and transform the result.
  async fn fetch(&self, service: &dyn QueryService, scope: &QueryScope) -> Result<Self::Output>;

  /// Whether a real-time sale update should reload this dataset.
  fn reloads_on_sale_update(&self) -> bool {
    false
  }
}

/// Headline KPIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SalesSummary;

#[async_trait]
impl Dataset for SalesSummary {
  type Output = DashboardAggregate;

  const KEY: &'static str = "main";
  const PARTITION: Partition = Partition::Dashboard;
  const LABEL: &'static str = "dashboard";

  async fn fetch(
    &self,
    service: &dyn QueryService,
    scope: &QueryScope,
  ) -> Result<DashboardAggregate> {
    let all_domain = scope.order_domain("");
    let mut today_domain = scope.order_domain("");
    today_domain.push(Condition::ge("date_order", transform::start_of_day(&scope.now)));

    let (all, today) = futures::try_join!(
      service.search_read(
        "sale.order",
        &all_domain,
        &["amount_total", "date_order"],
        scope.options()
      ),
      service.search_read("sale.order", &today_domain, &["amount_total"], scope.options()),
    )?;

    let all: Vec<ApiSaleOrder> = parse_records("sale.order", &all)?;
    let today: Vec<ApiSaleOrder> = parse_records("sale.order", &today)?;

    Ok(transform::aggregate(&all, &today))
  }

  fn reloads_on_sale_update(&self) -> bool {
    true
  }
}

/// Revenue and cost of goods for the top product categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevenueCogs;

#[async_trait]
impl Dataset for RevenueCogs {
  type Output = ChartSeries;

  const KEY: &'static str = "revenue_cogs";
  const PARTITION: Partition = Partition::Chart;
  const LABEL: &'static str = "Revenue vs COGS";

  async fn fetch(&self, service: &dyn QueryService, scope: &QueryScope) -> Result<ChartSeries> {
    let records = service
      .search_read(
        "sale.order.line",
        &scope.order_domain("order_id."),
        &["product_id", "price_subtotal", "product_uom_qty", "price_unit"],
        scope.options(),
      )
      .await?;
    let lines: Vec<ApiOrderLine> = parse_records("sale.order.line", &records)?;

    if lines.is_empty() {
      return Ok(ChartSeries::empty(&[transform::REVENUE, transform::COGS]));
    }

    let product_ids: BTreeSet<i64> = lines
      .iter()
      .filter_map(|l| l.product_id.as_ref().map(|p| p.id))
      .collect();

    let records = service
      .search_read(
        "product.product",
        &[Condition::is_in("id", product_ids)],
        &["categ_id", "standard_price"],
        SearchOptions::default(),
      )
      .await?;
    let products: Vec<ApiProduct> = parse_records("product.product", &records)?;

    Ok(transform::revenue_cogs(&lines, &products))
  }
}

/// Daily sales totals for the most recent days.
#[derive(Debug, Clone, Copy, Default)]
pub struct SalesTrend;

#[async_trait]
impl Dataset for SalesTrend {
  type Output = ChartSeries;

  const KEY: &'static str = "sales_trend";
  const PARTITION: Partition = Partition::Chart;
  const LABEL: &'static str = "sales trend";

  async fn fetch(&self, service: &dyn QueryService, scope: &QueryScope) -> Result<ChartSeries> {
    let records = service
      .search_read(
        "sale.order",
        &scope.order_domain(""),
        &["amount_total", "date_order"],
        scope.options(),
      )
      .await?;
    let orders: Vec<ApiSaleOrder> = parse_records("sale.order", &records)?;

    Ok(transform::sales_trend(&orders, &Local))
  }
}
