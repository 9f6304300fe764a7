//! Offline-first loading for a single dataset.

use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::datasets::{Dataset, QueryScope};
use crate::cache::CacheStore;
use crate::connectivity::ConnectivityMonitor;
use crate::erp::QueryService;
use crate::notify::Notifier;

/// Where the current data came from, or why there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
  /// Nothing attempted yet
  Idle,
  /// A load is in flight
  Loading,
  /// Fresh from the server
  Fresh,
  /// Offline, serving the last cached value
  OfflineCache,
  /// Offline and nothing cached
  NoOfflineData,
  /// The server failed, serving the last cached value
  FallbackCache,
  /// The server failed and nothing was cached
  Failed(String),
}

impl LoadStatus {
  pub fn label(&self) -> &str {
    match self {
      LoadStatus::Idle => "idle",
      LoadStatus::Loading => "loading",
      LoadStatus::Fresh => "live",
      LoadStatus::OfflineCache => "offline cache",
      LoadStatus::NoOfflineData => "no offline data",
      LoadStatus::FallbackCache => "cached (server error)",
      LoadStatus::Failed(_) => "failed",
    }
  }
}

/// Observable state of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadState<T> {
  pub data: Option<T>,
  pub status: LoadStatus,
  /// When `data` was fetched from the server
  pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for LoadState<T> {
  fn default() -> Self {
    Self {
      data: None,
      status: LoadStatus::Idle,
      updated_at: None,
    }
  }
}

/// Things that cause a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
  Startup,
  ConnectivityChanged(bool),
  /// Pushed by the host when an order is confirmed or delivered
  SaleUpdate,
  /// User asked for a refresh
  Manual,
}

/// Query parameters that stay fixed for the whole session.
#[derive(Debug, Clone)]
pub struct ScopeSettings {
  pub user_id: i64,
  pub lookback_days: u32,
  pub limit: u32,
}

/// Collaborators shared by every loader.
#[derive(Clone)]
pub struct LoaderContext {
  pub service: Arc<dyn QueryService>,
  pub cache: CacheStore,
  pub connectivity: ConnectivityMonitor,
  pub notifier: Notifier,
  pub scope: ScopeSettings,
}

/// Loads one dataset from the server, the cache, or both.
///
/// Loads are independent: concurrent calls are neither merged nor cancelled,
/// and whichever finishes last owns the cache entry and the published state.
pub struct DataLoader<D: Dataset> {
  dataset: D,
  ctx: LoaderContext,
  state: watch::Sender<LoadState<D::Output>>,
}

impl<D: Dataset> DataLoader<D> {
  pub fn new(dataset: D, ctx: LoaderContext) -> Self {
    let (state, _rx) = watch::channel(LoadState::default());
    Self {
      dataset,
      ctx,
      state,
    }
  }

  pub fn subscribe(&self) -> watch::Receiver<LoadState<D::Output>> {
    self.state.subscribe()
  }

  /// Snapshot of the current state.
  pub fn state(&self) -> LoadState<D::Output> {
    self.state.borrow().clone()
  }

  fn publish(&self, f: impl FnOnce(&mut LoadState<D::Output>)) {
    self.state.send_modify(f);
  }

  fn scope(&self) -> QueryScope {
    let s = &self.ctx.scope;
    QueryScope {
      user_id: s.user_id,
      lookback_days: s.lookback_days,
      limit: s.limit,
      now: Local::now(),
    }
  }

  /// Refresh this dataset.
  pub async fn load(&self) {
    self.publish(|s| s.status = LoadStatus::Loading);

    if !self.ctx.connectivity.is_online() {
      self.load_offline().await;
      return;
    }

    let scope = self.scope();
    match self.dataset.fetch(self.ctx.service.as_ref(), &scope).await {
      Ok(data) => self.adopt_fresh(data).await,
      Err(e) => self.fall_back(e).await,
    }
  }

  async fn load_offline(&self) {
    match self.ctx.cache.read::<D::Output>(D::PARTITION, D::KEY).await {
      Some(cached) => {
        self.publish(|s| {
          s.data = Some(cached.data);
          s.status = LoadStatus::OfflineCache;
          s.updated_at = Some(cached.cached_at);
        });
        self
          .ctx
          .notifier
          .info(format!("Loaded {} from offline data", D::LABEL));
      }
      None => {
        self.publish(|s| s.status = LoadStatus::NoOfflineData);
        self
          .ctx
          .notifier
          .warning(format!("No offline {} data available", D::LABEL));
      }
    }
  }

  async fn adopt_fresh(&self, data: D::Output) {
    // State is adopted before caching; a failed write does not roll it back
    self.publish(|s| {
      s.data = Some(data.clone());
      s.status = LoadStatus::Fresh;
      s.updated_at = Some(Utc::now());
    });
    tracing::debug!(dataset = D::KEY, "loaded from server");

    if let Err(e) = self.ctx.cache.write(D::PARTITION, D::KEY, &data).await {
      tracing::warn!(dataset = D::KEY, error = %e, "cache write failed");
      self
        .ctx
        .notifier
        .warning(format!("Could not cache {} for offline use", D::LABEL));
    }
  }

  async fn fall_back(&self, error: color_eyre::Report) {
    tracing::error!(dataset = D::KEY, error = %error, "load failed");
    self
      .ctx
      .notifier
      .danger(format!("Error loading {} data", D::LABEL));

    match self.ctx.cache.read::<D::Output>(D::PARTITION, D::KEY).await {
      Some(cached) => {
        self.publish(|s| {
          s.data = Some(cached.data);
          s.status = LoadStatus::FallbackCache;
          s.updated_at = Some(cached.cached_at);
        });
        self
          .ctx
          .notifier
          .info(format!("Loaded {} from cache due to error", D::LABEL));
      }
      None => {
        let message = error.to_string();
        self.publish(|s| s.status = LoadStatus::Failed(message));
      }
    }
  }
}

/// Reload `loader` on every connectivity edge and on every relevant trigger.
///
/// An initial load starts immediately. Each trigger spawns its own load.
pub fn spawn_triggered<D: Dataset>(
  loader: Arc<DataLoader<D>>,
  mut triggers: broadcast::Receiver<ReloadTrigger>,
) -> JoinHandle<()> {
  let mut online = loader.ctx.connectivity.subscribe();

  tokio::spawn(async move {
    spawn_load(&loader, ReloadTrigger::Startup);

    loop {
      let trigger = tokio::select! {
        changed = online.changed() => match changed {
          Ok(()) => ReloadTrigger::ConnectivityChanged(*online.borrow_and_update()),
          Err(_) => break,
        },
        received = triggers.recv() => match received {
          Ok(trigger) => trigger,
          Err(broadcast::error::RecvError::Lagged(skipped)) => {
            tracing::debug!(dataset = D::KEY, skipped, "reload triggers lagged");
            ReloadTrigger::Manual
          }
          Err(broadcast::error::RecvError::Closed) => break,
        },
      };

      let wanted = match trigger {
        ReloadTrigger::SaleUpdate => loader.dataset.reloads_on_sale_update(),
        _ => true,
      };
      if wanted {
        spawn_load(&loader, trigger);
      }
    }
  })
}

fn spawn_load<D: Dataset>(loader: &Arc<DataLoader<D>>, trigger: ReloadTrigger) {
  tracing::debug!(dataset = D::KEY, ?trigger, "reload");
  let loader = Arc::clone(loader);
  tokio::spawn(async move { loader.load().await });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{FileStorage, MemoryStorage, Partition, SqliteStorage};
  use crate::dashboard::datasets::{RevenueCogs, SalesSummary, SalesTrend};
  use crate::dashboard::testing::{record, FailingWrites, FakeQueryService};
  use crate::dashboard::types::{ChartSeries, DashboardAggregate};
  use crate::notify::{Notification, Severity};
  use color_eyre::eyre::eyre;
  use serde_json::json;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::time::Duration;
  use tokio::sync::mpsc;

  struct Harness {
    ctx: LoaderContext,
    service: Arc<FakeQueryService>,
    notifications: mpsc::UnboundedReceiver<Notification>,
  }

  impl Harness {
    fn new(service: FakeQueryService) -> Self {
      Self::with_cache(service, CacheStore::new(MemoryStorage::new()))
    }

    fn with_cache(service: FakeQueryService, cache: CacheStore) -> Self {
      let service = Arc::new(service);
      let (notifier, notifications) = crate::notify::Notifier::channel();
      let ctx = LoaderContext {
        service: service.clone(),
        cache,
        connectivity: ConnectivityMonitor::new(true),
        notifier,
        scope: ScopeSettings {
          user_id: 7,
          lookback_days: 30,
          limit: 1000,
        },
      };
      Self {
        ctx,
        service,
        notifications,
      }
    }

    fn drain(&mut self) -> Vec<Notification> {
      let mut out = Vec::new();
      while let Ok(n) = self.notifications.try_recv() {
        out.push(n);
      }
      out
    }
  }

  /// Orders on three distinct days, for every model the datasets query.
  fn sales_service() -> FakeQueryService {
    FakeQueryService::new(|model, _| match model {
      "sale.order" => Ok(vec![
        record(json!({"amount_total": 100.0, "date_order": "2024-06-10 12:00:00"})),
        record(json!({"amount_total": 250.0, "date_order": "2024-06-11 12:00:00"})),
        record(json!({"amount_total": 0.0, "date_order": "2024-06-12 12:00:00"})),
      ]),
      "sale.order.line" => Ok(vec![record(json!({
        "product_id": [1, "Desk"],
        "price_subtotal": 300.0,
        "product_uom_qty": 2.0,
        "price_unit": 0.0
      }))]),
      "product.product" => Ok(vec![record(json!({
        "id": 1, "categ_id": [10, "Desks"], "standard_price": 90.0
      }))]),
      other => Err(eyre!("unexpected model {}", other)),
    })
  }

  /// Load every dataset online, then again offline through new loaders
  /// sharing `cache`, as after a restart, and compare what was shown.
  async fn assert_offline_reproduces_online(cache: CacheStore) {
    let h = Harness::with_cache(sales_service(), cache);

    let summary = DataLoader::new(SalesSummary, h.ctx.clone());
    let revenue = DataLoader::new(RevenueCogs, h.ctx.clone());
    let trend = DataLoader::new(SalesTrend, h.ctx.clone());
    summary.load().await;
    revenue.load().await;
    trend.load().await;

    let online = (summary.state(), revenue.state(), trend.state());
    assert_eq!(online.0.status, LoadStatus::Fresh);

    h.ctx.connectivity.set_online(false);

    // Fresh loaders, as after a restart
    let summary = DataLoader::new(SalesSummary, h.ctx.clone());
    let revenue = DataLoader::new(RevenueCogs, h.ctx.clone());
    let trend = DataLoader::new(SalesTrend, h.ctx.clone());
    summary.load().await;
    revenue.load().await;
    trend.load().await;

    assert_eq!(summary.state().status, LoadStatus::OfflineCache);
    assert_eq!(summary.state().data, online.0.data);
    assert_eq!(revenue.state().data, online.1.data);
    assert_eq!(trend.state().data, online.2.data);
  }

  #[tokio::test]
  async fn test_offline_reproduces_last_online_load() {
    assert_offline_reproduces_online(CacheStore::new(MemoryStorage::new())).await;
  }

  #[tokio::test]
  async fn test_offline_reproduces_last_online_load_from_sqlite() {
    assert_offline_reproduces_online(CacheStore::new(SqliteStorage::in_memory())).await;
  }

  #[tokio::test]
  async fn test_offline_reproduces_last_online_load_from_files() {
    let dir = tempfile::tempdir().unwrap();
    assert_offline_reproduces_online(CacheStore::new(FileStorage::new(dir.path()))).await;
  }

  #[tokio::test]
  async fn test_online_loads_are_idempotent() {
    let h = Harness::new(sales_service());
    let loader = DataLoader::new(SalesSummary, h.ctx.clone());

    loader.load().await;
    let first = h
      .ctx
      .cache
      .read::<DashboardAggregate>(Partition::Dashboard, "main")
      .await
      .unwrap()
      .data;

    loader.load().await;
    let second = h
      .ctx
      .cache
      .read::<DashboardAggregate>(Partition::Dashboard, "main")
      .await
      .unwrap()
      .data;

    assert_eq!(first, second);
    assert_eq!(first.total_orders, 3);
    assert_eq!(first.average_order_value, 350.0 / 3.0);
  }

  #[tokio::test]
  async fn test_empty_result_is_cached_not_an_error() {
    let mut h = Harness::new(FakeQueryService::new(|_, _| Ok(vec![])));

    let trend = DataLoader::new(SalesTrend, h.ctx.clone());
    let revenue = DataLoader::new(RevenueCogs, h.ctx.clone());
    trend.load().await;
    revenue.load().await;

    let cached = h
      .ctx
      .cache
      .read::<ChartSeries>(Partition::Chart, "sales_trend")
      .await
      .expect("empty shape is cached");
    assert!(cached.data.is_empty());
    assert!(cached.data.is_aligned());

    let cached = h
      .ctx
      .cache
      .read::<ChartSeries>(Partition::Chart, "revenue_cogs")
      .await
      .expect("empty shape is cached");
    assert!(cached.data.labels.is_empty());

    assert_eq!(trend.state().status, LoadStatus::Fresh);
    assert!(h.drain().iter().all(|n| n.severity != Severity::Danger));
  }

  #[tokio::test]
  async fn test_query_failure_falls_back_to_cache() {
    let failing = Arc::new(AtomicBool::new(false));
    let flag = failing.clone();
    let mut h = Harness::new(FakeQueryService::new(move |_, _| {
      if flag.load(Ordering::SeqCst) {
        Err(eyre!("connection reset"))
      } else {
        Ok(vec![record(json!({"amount_total": 42.0, "date_order": "2024-06-10 12:00:00"}))])
      }
    }));
    let loader = DataLoader::new(SalesTrend, h.ctx.clone());

    loader.load().await;
    let good = loader.state().data;
    h.drain();

    failing.store(true, Ordering::SeqCst);
    loader.load().await;

    assert_eq!(loader.state().status, LoadStatus::FallbackCache);
    assert_eq!(loader.state().data, good);

    let notes = h.drain();
    assert_eq!(notes[0].severity, Severity::Danger);
    assert_eq!(notes[0].message, "Error loading sales trend data");
    assert_eq!(notes[1].severity, Severity::Info);
  }

  #[tokio::test]
  async fn test_query_failure_without_cache_keeps_prior_state() {
    let h = Harness::new(FakeQueryService::new(|_, _| Err(eyre!("boom"))));
    let loader = DataLoader::new(SalesSummary, h.ctx.clone());

    loader.load().await;

    let state = loader.state();
    assert_eq!(state.data, None);
    assert!(matches!(state.status, LoadStatus::Failed(ref m) if m.contains("boom")));
  }

  #[tokio::test]
  async fn test_offline_without_cache() {
    let mut h = Harness::new(sales_service());
    h.ctx.connectivity.set_online(false);
    let loader = DataLoader::new(RevenueCogs, h.ctx.clone());

    loader.load().await;

    assert_eq!(loader.state().status, LoadStatus::NoOfflineData);
    assert_eq!(loader.state().data, None);
    assert!(h.service.calls().is_empty());

    let notes = h.drain();
    assert_eq!(
      notes,
      vec![Notification {
        severity: Severity::Warning,
        message: "No offline Revenue vs COGS data available".to_string()
      }]
    );
  }

  #[tokio::test]
  async fn test_cache_write_failure_still_adopts_state() {
    let mut h = Harness::with_cache(sales_service(), CacheStore::new(FailingWrites::default()));
    let loader = DataLoader::new(SalesSummary, h.ctx.clone());

    loader.load().await;

    let state = loader.state();
    assert_eq!(state.status, LoadStatus::Fresh);
    assert_eq!(state.data.unwrap().total_orders, 3);

    let notes = h.drain();
    assert!(notes
      .iter()
      .any(|n| n.severity == Severity::Warning && n.message.contains("Could not cache")));
  }

  #[tokio::test]
  async fn test_observers_see_each_mutation() {
    let h = Harness::new(sales_service());
    let loader = DataLoader::new(SalesSummary, h.ctx.clone());
    let mut rx = loader.subscribe();

    loader.load().await;

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.status, LoadStatus::Fresh);
    assert!(state.updated_at.is_some());
  }

  #[tokio::test]
  async fn test_chart_reloads_on_connectivity_edges_but_not_sale_updates() {
    let h = Harness::new(sales_service());
    let trend = Arc::new(DataLoader::new(SalesTrend, h.ctx.clone()));
    let (tx, _) = broadcast::channel(8);
    let task = spawn_triggered(trend.clone(), tx.subscribe());

    // Startup load
    wait_for_calls(&h.service, 1).await;

    // Going offline reads the cache, coming back online queries again
    h.ctx.connectivity.set_online(false);
    h.ctx.connectivity.set_online(true);
    wait_for_calls(&h.service, 2).await;

    tx.send(ReloadTrigger::SaleUpdate).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.service.calls().len(), 2);

    tx.send(ReloadTrigger::Manual).unwrap();
    wait_for_calls(&h.service, 3).await;

    task.abort();
  }

  #[tokio::test]
  async fn test_going_offline_alone_serves_the_cache() {
    let mut h = Harness::new(sales_service());
    let trend = Arc::new(DataLoader::new(SalesTrend, h.ctx.clone()));
    let (tx, _) = broadcast::channel(8);
    let task = spawn_triggered(trend.clone(), tx.subscribe());

    wait_for(|| trend.state().status == LoadStatus::Fresh).await;
    let online = trend.state().data;
    for _ in 0..200 {
      let cached = h.ctx.cache.read::<ChartSeries>(Partition::Chart, "sales_trend").await;
      if cached.is_some() {
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    h.drain();

    h.ctx.connectivity.set_online(false);
    wait_for(|| trend.state().status == LoadStatus::OfflineCache).await;

    assert_eq!(trend.state().data, online);
    assert_eq!(h.service.calls().len(), 1);
    assert!(h
      .drain()
      .iter()
      .any(|n| n.message == "Loaded sales trend from offline data"));

    task.abort();
  }

  #[tokio::test]
  async fn test_summary_reloads_on_sale_update() {
    let h = Harness::new(sales_service());
    let summary = Arc::new(DataLoader::new(SalesSummary, h.ctx.clone()));
    let (tx, _) = broadcast::channel(8);
    let task = spawn_triggered(summary.clone(), tx.subscribe());

    // Each summary load issues two queries
    wait_for_calls(&h.service, 2).await;

    tx.send(ReloadTrigger::SaleUpdate).unwrap();
    wait_for_calls(&h.service, 4).await;
    wait_for(|| summary.state().status == LoadStatus::Fresh).await;

    task.abort();
  }

  async fn wait_for_calls(service: &FakeQueryService, n: usize) {
    wait_for(|| service.calls().len() >= n).await;
  }

  async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
      if check() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
  }
}
