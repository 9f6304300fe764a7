//! Dashboard datasets and the offline-first loaders that keep them current.

pub mod datasets;
pub mod loader;
pub mod preferences;
pub mod transform;
pub mod types;

pub use datasets::{Dataset, RevenueCogs, SalesSummary, SalesTrend};
pub use loader::{
  spawn_triggered, DataLoader, LoadState, LoadStatus, LoaderContext, ReloadTrigger, ScopeSettings,
};
pub use preferences::{ChartVisibility, EditModeState, PreferenceStore};
pub use types::{ChartKind, ChartSeries, DashboardAggregate};
