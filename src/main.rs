use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use url::Url;

use saledash::app::{App, Feeds};
use saledash::cache::{
  scope_id, CacheStore, FileStorage, MemoryStorage, NoopStorage, SqliteStorage,
};
use saledash::config::{CacheBackend, Config};
use saledash::connectivity::ConnectivityMonitor;
use saledash::dashboard::{
  spawn_triggered, DataLoader, LoaderContext, PreferenceStore, RevenueCogs, SalesSummary,
  SalesTrend, ScopeSettings,
};
use saledash::erp::ErpClient;
use saledash::notify::Notifier;

/// Buffered reload requests per loader before older ones are dropped
const TRIGGER_CAPACITY: usize = 16;

#[derive(Parser, Debug)]
#[command(name = "saledash")]
#[command(about = "An offline-first terminal sales dashboard for Odoo-style ERPs")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/saledash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Salesperson user id to show instead of the configured one
  #[arg(short, long)]
  user: Option<i64>,

  /// Start in forced offline mode, serving cached data only
  #[arg(long)]
  offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(user) = args.user {
    config.server.user_id = user;
  }

  let _log_guard = init_logging()?;
  tracing::info!(server = %config.server.url, user_id = config.server.user_id, "starting");

  let client = ErpClient::new(&config)?;
  let cache = open_cache(&config)?;

  let connectivity = ConnectivityMonitor::new(true);
  connectivity.set_forced_offline(args.offline);
  if config.connectivity.check_interval_secs > 0 {
    let url = Url::parse(&config.server.url)
      .map_err(|e| eyre!("Invalid server url {}: {}", config.server.url, e))?;
    connectivity.spawn_checker(
      url,
      Duration::from_secs(config.connectivity.check_interval_secs),
      Duration::from_secs(config.connectivity.request_timeout_secs),
    );
  }

  let (notifier, notifications) = Notifier::channel();

  let ctx = LoaderContext {
    service: Arc::new(client),
    cache: cache.clone(),
    connectivity,
    notifier: notifier.clone(),
    scope: ScopeSettings {
      user_id: config.server.user_id,
      lookback_days: config.dashboard.lookback_days,
      limit: config.dashboard.query_limit,
    },
  };

  let summary = Arc::new(DataLoader::new(SalesSummary, ctx.clone()));
  let revenue_cogs = Arc::new(DataLoader::new(RevenueCogs, ctx.clone()));
  let sales_trend = Arc::new(DataLoader::new(SalesTrend, ctx.clone()));

  let feeds = Feeds {
    summary: summary.subscribe(),
    revenue_cogs: revenue_cogs.subscribe(),
    sales_trend: sales_trend.subscribe(),
  };

  let (triggers, _) = broadcast::channel(TRIGGER_CAPACITY);
  spawn_triggered(summary, triggers.subscribe());
  spawn_triggered(revenue_cogs, triggers.subscribe());
  spawn_triggered(sales_trend, triggers.subscribe());

  let preferences = PreferenceStore::load(cache, notifier).await;
  let user = match &config.server.login {
    Some(login) => login.clone(),
    None => format!("user {}", config.server.user_id),
  };

  let mut app = App::new(
    config.display_title(),
    user,
    feeds,
    preferences,
    &ctx,
    triggers,
  );
  app.run(notifications).await?;

  Ok(())
}

/// Log to a daily rolling file; the terminal belongs to the TUI.
fn init_logging() -> Result<WorkerGuard> {
  let dir = data_dir()?.join("logs");
  let appender = RollingFileAppender::builder()
    .rotation(Rotation::DAILY)
    .filename_prefix("saledash")
    .filename_suffix("log")
    .build(&dir)
    .map_err(|e| eyre!("Failed to open log directory {}: {}", dir.display(), e))?;
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("saledash=info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

fn data_dir() -> Result<PathBuf> {
  dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .map(|p| p.join("saledash"))
    .ok_or_else(|| eyre!("Could not determine data directory"))
}

/// Build the configured cache backend. Each server, database and user gets
/// its own cache so switching accounts never shows someone else's data.
fn open_cache(config: &Config) -> Result<CacheStore> {
  let user = config.server.user_id.to_string();
  let scope = scope_id(&[&config.server.url, &config.server.database, &user]);
  let explicit = config.cache.path.as_deref();

  let store = match config.cache.backend {
    CacheBackend::Sqlite => {
      let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => SqliteStorage::default_path(&scope)?,
      };
      tracing::info!(path = %path.display(), "using sqlite cache");
      CacheStore::new(SqliteStorage::at(path))
    }
    CacheBackend::File => {
      let dir = match explicit {
        Some(p) => p.to_path_buf(),
        None => data_dir()?.join(format!("cache-{}", scope)),
      };
      tracing::info!(dir = %dir.display(), "using file cache");
      CacheStore::new(FileStorage::new(dir))
    }
    CacheBackend::Memory => CacheStore::new(MemoryStorage::new()),
    CacheBackend::None => CacheStore::new(NoopStorage),
  };

  Ok(store)
}
