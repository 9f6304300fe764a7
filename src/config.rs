use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub server: ServerConfig,
  /// Custom title for header (defaults to the server's domain if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub dashboard: DashboardConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub url: String,
  pub database: String,
  /// Numeric id of the salesperson whose orders are shown
  pub user_id: i64,
  /// Login name, only used for display
  pub login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
  /// Every remote query is limited to this many days of history
  #[serde(default = "default_lookback_days")]
  pub lookback_days: u32,
  /// Maximum number of records fetched per query
  #[serde(default = "default_query_limit")]
  pub query_limit: u32,
}

impl Default for DashboardConfig {
  fn default() -> Self {
    Self {
      lookback_days: default_lookback_days(),
      query_limit: default_query_limit(),
    }
  }
}

fn default_lookback_days() -> u32 {
  30
}

fn default_query_limit() -> u32 {
  1000
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
  /// SQLite database in the data directory
  #[default]
  Sqlite,
  /// One JSON document per partition
  File,
  /// Process memory only; nothing survives a restart
  Memory,
  /// Caching disabled
  None,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub backend: CacheBackend,
  /// Database file (sqlite) or directory (file). Defaults to the data directory.
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
  /// How often server reachability is checked; 0 disables checking
  #[serde(default = "default_check_interval")]
  pub check_interval_secs: u64,
  /// Timeout applied to every HTTP request
  #[serde(default = "default_request_timeout")]
  pub request_timeout_secs: u64,
}

impl Default for ConnectivityConfig {
  fn default() -> Self {
    Self {
      check_interval_secs: default_check_interval(),
      request_timeout_secs: default_request_timeout(),
    }
  }
}

fn default_check_interval() -> u64 {
  15
}

fn default_request_timeout() -> u64 {
  30
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./saledash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/saledash/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/saledash/config.yaml\n\
                 See saledash.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("saledash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("saledash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;

    if config.dashboard.lookback_days == 0 {
      return Err(eyre!("dashboard.lookback_days must be at least 1"));
    }

    Ok(config)
  }

  /// Get the API key from environment variables.
  ///
  /// Checks SALEDASH_API_KEY first, then ODOO_API_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("SALEDASH_API_KEY")
      .or_else(|_| std::env::var("ODOO_API_KEY"))
      .map_err(|_| {
        eyre!("API key not found. Set SALEDASH_API_KEY or ODOO_API_KEY environment variable.")
      })
  }

  /// Header title: explicit title, or the server's domain.
  pub fn display_title(&self) -> String {
    match &self.title {
      Some(title) => title.clone(),
      None => extract_domain(&self.server.url).to_string(),
    }
  }
}

/// Extract domain from a server URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml(
      r#"
server:
  url: https://erp.example.com
  database: prod
  user_id: 7
"#,
    )
    .unwrap();

    assert_eq!(config.dashboard.lookback_days, 30);
    assert_eq!(config.dashboard.query_limit, 1000);
    assert_eq!(config.cache.backend, CacheBackend::Sqlite);
    assert_eq!(config.connectivity.check_interval_secs, 15);
    assert_eq!(config.display_title(), "erp.example.com");
  }

  #[test]
  fn test_full_config() {
    let config = Config::from_yaml(
      r#"
title: Sales
server:
  url: http://localhost:8069
  database: demo
  user_id: 2
  login: admin
dashboard:
  lookback_days: 7
cache:
  backend: file
  path: /tmp/saledash
connectivity:
  check_interval_secs: 0
"#,
    )
    .unwrap();

    assert_eq!(config.dashboard.lookback_days, 7);
    assert_eq!(config.dashboard.query_limit, 1000);
    assert_eq!(config.cache.backend, CacheBackend::File);
    assert_eq!(config.cache.path, Some(PathBuf::from("/tmp/saledash")));
    assert_eq!(config.connectivity.check_interval_secs, 0);
    assert_eq!(config.display_title(), "Sales");
  }

  #[test]
  fn test_zero_lookback_is_rejected() {
    let result = Config::from_yaml(
      r#"
server: {url: "http://x", database: d, user_id: 1}
dashboard: {lookback_days: 0}
"#,
    );
    assert!(result.is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let result = Config::load(Some(Path::new("/definitely/not/here.yaml")));
    assert!(result.is_err());
  }

  #[test]
  fn test_extract_domain() {
    assert_eq!(extract_domain("https://erp.example.com"), "erp.example.com");
    assert_eq!(extract_domain("https://erp.example.com/odoo"), "erp.example.com");
    assert_eq!(extract_domain("http://localhost:8069"), "localhost:8069");
  }
}
