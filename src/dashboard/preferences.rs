//! Persisted layout preferences: edit mode and which charts are shown.

use serde::{Deserialize, Serialize};

use super::types::ChartKind;
use crate::cache::{CacheStore, Partition};
use crate::notify::Notifier;

const EDIT_MODE_KEY: &str = "editModeState";
const CHART_STATE_KEY: &str = "chartState";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditModeState {
  pub is_edit_mode: bool,
  pub sidebar_visible: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVisibility {
  #[serde(rename = "showRevenueCOGSChart", alias = "showRevenueCogsChart")]
  pub show_revenue_cogs_chart: bool,
  pub show_sales_trend_chart: bool,
}

impl ChartVisibility {
  pub fn is_shown(&self, kind: ChartKind) -> bool {
    match kind {
      ChartKind::RevenueCogs => self.show_revenue_cogs_chart,
      ChartKind::SalesTrend => self.show_sales_trend_chart,
    }
  }

  fn set(&mut self, kind: ChartKind, shown: bool) {
    match kind {
      ChartKind::RevenueCogs => self.show_revenue_cogs_chart = shown,
      ChartKind::SalesTrend => self.show_sales_trend_chart = shown,
    }
  }
}

/// In-memory copy of the layout preferences, written through to the cache.
pub struct PreferenceStore {
  cache: CacheStore,
  notifier: Notifier,
  edit_mode: EditModeState,
  charts: ChartVisibility,
}

impl PreferenceStore {
  /// Restore saved preferences. Anything missing or unreadable starts out
  /// with defaults.
  pub async fn load(cache: CacheStore, notifier: Notifier) -> Self {
    let edit_mode = cache
      .read::<EditModeState>(Partition::Dashboard, EDIT_MODE_KEY)
      .await
      .map(|c| c.data)
      .unwrap_or_default();
    let charts = cache
      .read::<ChartVisibility>(Partition::Dashboard, CHART_STATE_KEY)
      .await
      .map(|c| c.data)
      .unwrap_or_default();

    Self {
      cache,
      notifier,
      edit_mode,
      charts,
    }
  }

  pub fn edit_mode(&self) -> EditModeState {
    self.edit_mode
  }

  pub fn charts(&self) -> ChartVisibility {
    self.charts
  }

  pub async fn toggle_edit_mode(&mut self) {
    let on = !self.edit_mode.is_edit_mode;
    self.edit_mode = EditModeState {
      is_edit_mode: on,
      sidebar_visible: on,
    };
    self.save_edit_mode().await;
  }

  pub async fn close_sidebar(&mut self) {
    self.edit_mode = EditModeState::default();
    self.save_edit_mode().await;
  }

  pub async fn add_chart(&mut self, kind: ChartKind) {
    self.charts.set(kind, true);
    self.save_charts().await;
    self
      .notifier
      .success(format!("{} added to dashboard", kind.title()));
  }

  pub async fn remove_chart(&mut self, kind: ChartKind) {
    self.charts.set(kind, false);
    self.save_charts().await;
    self
      .notifier
      .info(format!("{} removed from dashboard", kind.title()));
  }

  async fn save_edit_mode(&self) {
    if let Err(e) = self
      .cache
      .write(Partition::Dashboard, EDIT_MODE_KEY, &self.edit_mode)
      .await
    {
      tracing::warn!(error = %e, "failed to save edit mode");
    }
  }

  async fn save_charts(&self) {
    if let Err(e) = self
      .cache
      .write(Partition::Dashboard, CHART_STATE_KEY, &self.charts)
      .await
    {
      tracing::warn!(error = %e, "failed to save chart visibility");
    }
  }
}
