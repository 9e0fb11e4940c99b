use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::Database;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Directory for the database and logs (defaults to $XDG_DATA_HOME/todoq)
  pub data_dir: Option<PathBuf>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// API root; the todo collection lives at `{url}/todos`
  pub url: String,
  /// Per-request timeout for the network fetcher
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Active cache generation
  #[serde(default = "default_cache_version")]
  pub version: String,
  /// Base URL static assets are resolved against (defaults to the API url)
  pub origin: Option<String>,
  /// Paths pre-seeded into the cache when a generation is first installed
  #[serde(default = "default_static_assets")]
  pub static_assets: Vec<String>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      version: default_cache_version(),
      origin: None,
      static_assets: default_static_assets(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
  /// How often the shell checks that the API is reachable
  #[serde(default = "default_probe_interval_ms")]
  pub probe_interval_ms: u64,
}

impl Default for ConnectivityConfig {
  fn default() -> Self {
    Self {
      probe_interval_ms: default_probe_interval_ms(),
    }
  }
}

fn default_true() -> bool {
  true
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_cache_version() -> String {
  "todos.v0".to_string()
}

fn default_static_assets() -> Vec<String> {
  ["/", "/index.html", "/assets/style.css", "/js/todos.js"]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_probe_interval_ms() -> u64 {
  5000
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./todoq.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/todoq/config.yaml
  ///
  /// `TODOQ_API_URL` overrides `api.url` in any case. Returns `None` only
  /// when no path was given and the search found nothing; a file that
  /// exists but cannot be read or parsed is an error.
  pub fn load(explicit_path: Option<&Path>) -> Result<Option<Self>> {
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
      Some(p) => Ok(Some(Self::load_from_path(&p)?.with_env_overrides())),
      None => Ok(None),
    }
  }

  /// Load the config file, falling back to `api_url` only when there is none.
  pub fn resolve(explicit_path: Option<&Path>, api_url: Option<String>) -> Result<Self> {
    Self::or_api_url(Self::load(explicit_path)?, api_url)
  }

  fn or_api_url(found: Option<Self>, api_url: Option<String>) -> Result<Self> {
    match (found, api_url) {
      (Some(config), _) => Ok(config),
      (None, Some(url)) => Ok(Self::from_api_url(url)),
      (None, None) => Err(eyre!(
        "No configuration file found. Create one at ~/.config/todoq/config.yaml\n\
               or pass --api-url."
      )),
    }
  }

  /// Defaults around a single API url, used when no config file exists.
  pub fn from_api_url(url: impl Into<String>) -> Self {
    Self {
      api: ApiConfig {
        url: url.into(),
        timeout_secs: default_timeout_secs(),
      },
      data_dir: None,
      cache: CacheConfig::default(),
      connectivity: ConnectivityConfig::default(),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("todoq.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("todoq").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Self = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    config.validate()
  }

  fn validate(self) -> Result<Self> {
    if self.connectivity.probe_interval_ms == 0 {
      return Err(eyre!("connectivity.probe_interval_ms must be greater than 0"));
    }
    Ok(self)
  }

  fn with_env_overrides(mut self) -> Self {
    if let Ok(url) = std::env::var("TODOQ_API_URL") {
      self.api.url = url;
    }
    self
  }

  pub fn data_dir(&self) -> Result<PathBuf> {
    match &self.data_dir {
      Some(dir) => Ok(dir.clone()),
      None => Database::default_dir(),
    }
  }

  pub fn db_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("todoq.db"))
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }

  pub fn probe_interval(&self) -> Duration {
    Duration::from_millis(self.connectivity.probe_interval_ms)
  }

  /// Absolute URLs of the static manifest.
  pub fn static_asset_urls(&self) -> Result<Vec<String>> {
    let origin = self.cache.origin.as_deref().unwrap_or(&self.api.url);
    let base = url::Url::parse(origin).map_err(|e| eyre!("Invalid cache origin {}: {}", origin, e))?;

    self
      .cache
      .static_assets
      .iter()
      .map(|path| {
        base
          .join(path)
          .map(String::from)
          .map_err(|e| eyre!("Invalid static asset path {}: {}", path, e))
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_gets_defaults() {
    let config = Config::parse("api:\n  url: https://todos.example.com/api\n").unwrap();
    assert_eq!(config.api.timeout_secs, 10);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.version, "todos.v0");
    assert_eq!(config.connectivity.probe_interval_ms, 5000);
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  url: http://localhost:3000
  timeout_secs: 3
data_dir: /tmp/todoq
cache:
  enabled: false
  version: todos.v2
  origin: http://localhost:8080
  static_assets: ["/", "/app.js"]
connectivity:
  probe_interval_ms: 250
"#;
    let config = Config::parse(yaml).unwrap();
    assert!(!config.cache.enabled);
    assert_eq!(config.timeout(), Duration::from_secs(3));
    assert_eq!(config.probe_interval(), Duration::from_millis(250));
    assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/todoq/todoq.db"));
    assert_eq!(
      config.static_asset_urls().unwrap(),
      vec!["http://localhost:8080/", "http://localhost:8080/app.js"]
    );
  }

  #[test]
  fn test_static_assets_resolve_against_api_origin() {
    let config = Config::from_api_url("https://todos.example.com/api");
    let urls = config.static_asset_urls().unwrap();
    assert_eq!(urls[0], "https://todos.example.com/");
    assert_eq!(urls[2], "https://todos.example.com/assets/style.css");
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/todoq.yaml"))).is_err());
  }

  #[test]
  fn test_zero_probe_interval_is_rejected() {
    let yaml = "api:\n  url: http://localhost:3000\nconnectivity:\n  probe_interval_ms: 0\n";
    let err = Config::parse(yaml).unwrap_err();
    assert!(err.to_string().contains("probe_interval_ms"));
  }

  #[test]
  fn test_broken_config_file_is_not_replaced_by_api_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todoq.yaml");
    std::fs::write(&path, "api: [not, a, mapping\n").unwrap();

    let result = Config::resolve(Some(path.as_path()), Some("http://fallback".to_string()));
    assert!(result.is_err());
  }

  #[test]
  fn test_api_url_stands_in_for_missing_file() {
    let config = Config::or_api_url(None, Some("http://fallback".to_string())).unwrap();
    assert_eq!(config.api.url, "http://fallback");
    assert!(Config::or_api_url(None, None).is_err());

    let found = Config::from_api_url("http://from-file");
    let config = Config::or_api_url(Some(found), Some("http://fallback".to_string())).unwrap();
    assert_eq!(config.api.url, "http://from-file");
  }
}
