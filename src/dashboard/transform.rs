//! Pure transforms from raw records to dashboard shapes.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap};

use super::types::{ChartSeries, DashboardAggregate, NamedSeries};
use crate::erp::api_types::{ApiOrderLine, ApiProduct, ApiSaleOrder};

/// Categories kept on the revenue vs COGS chart.
pub const TOP_CATEGORIES: usize = 5;
/// Dates kept on the sales trend chart.
pub const TREND_DAYS: usize = 7;

pub const REVENUE: &str = "Revenue";
pub const COGS: &str = "COGS";
pub const DAILY_SALES: &str = "Daily Sales";

/// Datetime format the host uses on the wire (always UTC).
const HOST_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// Granularity used to find the first local time of a day; offsets change on quarter hours.
const STEP_MINUTES: i64 = 15;
const DAY_STEPS: i64 = 24 * 60 / STEP_MINUTES;

/// First day of the lookback window, as a host date string.
pub fn window_start<Tz: TimeZone>(now: &DateTime<Tz>, days: u32) -> String {
  let start = now.with_timezone(&Utc) - Duration::days(i64::from(days));
  start.format("%Y-%m-%d").to_string()
}

/// Local midnight of `now`, as a host UTC datetime string.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
  let tz = now.timezone();
  let midnight = now.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default();

  // A DST change can skip midnight; the day then starts at the first local time after the gap
  let utc = (0..DAY_STEPS)
    .find_map(|step| {
      let local = midnight + Duration::minutes(step * STEP_MINUTES);
      tz.from_local_datetime(&local).earliest()
    })
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or_else(|| now.with_timezone(&Utc));

  utc.format(HOST_DATETIME).to_string()
}

/// Headline KPIs. `all` and `today` come from separate queries; `today` only
/// contributes its count.
pub fn aggregate(all: &[ApiSaleOrder], today: &[ApiSaleOrder]) -> DashboardAggregate {
  let total_orders = all.len() as u64;
  let total_revenue: f64 = all.iter().map(|o| o.amount_total).sum();
  let average_order_value = if total_orders > 0 {
    total_revenue / total_orders as f64
  } else {
    0.0
  };

  DashboardAggregate {
    total_orders,
    total_revenue,
    orders_today: today.len() as u64,
    average_order_value,
  }
}

/// Revenue and cost of goods per product category, top categories by revenue.
///
/// Lines whose product is missing from `products` are skipped. COGS uses the
/// line's unit price when set, otherwise the product's standard cost.
pub fn revenue_cogs(lines: &[ApiOrderLine], products: &[ApiProduct]) -> ChartSeries {
  let by_product: HashMap<i64, &ApiProduct> = products.iter().map(|p| (p.id, p)).collect();

  let mut categories: HashMap<String, (f64, f64)> = HashMap::new();
  for line in lines {
    let Some(product) = line.product_id.as_ref().and_then(|p| by_product.get(&p.id)) else {
      continue;
    };
    let category = product
      .categ_id
      .as_ref()
      .map(|c| c.name.clone())
      .unwrap_or_else(|| "Uncategorized".to_string());

    let unit_cost = if line.price_unit != 0.0 {
      line.price_unit
    } else {
      product.standard_price
    };

    let entry = categories.entry(category).or_insert((0.0, 0.0));
    entry.0 += line.price_subtotal;
    entry.1 += unit_cost * line.product_uom_qty;
  }

  let mut ranked: Vec<(String, (f64, f64))> = categories.into_iter().collect();
  ranked.sort_by(|a, b| b.1 .0.total_cmp(&a.1 .0).then_with(|| a.0.cmp(&b.0)));
  ranked.truncate(TOP_CATEGORIES);

  let mut chart = ChartSeries::empty(&[REVENUE, COGS]);
  for (label, (revenue, cogs)) in ranked {
    chart.labels.push(label);
    chart.series[0].values.push(revenue);
    chart.series[1].values.push(cogs);
  }
  chart
}

/// Daily sales totals, grouped by the calendar date of `date_order` in `tz`.
///
/// Orders without a parseable date are skipped. Only the latest
/// [`TREND_DAYS`] dates are kept, oldest first.
pub fn sales_trend<Tz: TimeZone>(orders: &[ApiSaleOrder], tz: &Tz) -> ChartSeries {
  let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();

  for order in orders {
    let Some(raw) = order.date_order.as_deref() else {
      continue;
    };
    let date = match NaiveDateTime::parse_from_str(raw, HOST_DATETIME) {
      Ok(naive) => naive.and_utc().with_timezone(tz).date_naive(),
      Err(e) => {
        tracing::debug!(date_order = raw, error = %e, "skipping order with unparseable date");
        continue;
      }
    };
    *by_date.entry(date).or_insert(0.0) += order.amount_total;
  }

  let skip = by_date.len().saturating_sub(TREND_DAYS);
  let (labels, values): (Vec<String>, Vec<f64>) = by_date
    .into_iter()
    .skip(skip)
    .map(|(date, total)| (date.format("%Y-%m-%d").to_string(), total))
    .unzip();

  ChartSeries {
    labels,
    series: vec![NamedSeries {
      name: DAILY_SALES.to_string(),
      values,
    }],
  }
}
