use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::store::SqliteStore;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Database file (default: $XDG_DATA_HOME/relwatch/relwatch.db)
  pub database: Option<PathBuf>,
  /// Owner applied to bare "repo" specs
  pub default_owner: String,
  pub github: GitHubConfig,
  pub log: LogConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database: None,
      default_owner: "docker".to_string(),
      github: GitHubConfig::default(),
      log: LogConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
  /// Base URL of the REST API
  pub api_url: String,
  /// Environment variable holding the auth token
  pub token_env: String,
  /// Upper bound for a single request, in seconds
  pub timeout_secs: u64,
  pub user_agent: String,
  /// Projects resolved at the same time while listing
  pub concurrency: usize,
  /// Token given directly (set from the command line, never from the file)
  #[serde(skip)]
  pub token: Option<String>,
}

impl Default for GitHubConfig {
  fn default() -> Self {
    Self {
      api_url: "https://api.github.com".to_string(),
      token_env: "GITHUB_TOKEN".to_string(),
      timeout_secs: 10,
      user_agent: "relwatch".to_string(),
      concurrency: 8,
      token: None,
    }
  }
}

impl GitHubConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  /// Auth token: the explicit one if set, else the configured environment
  /// variable. `None` means unauthenticated requests.
  pub fn resolve_token(&self) -> Option<String> {
    self
      .token
      .clone()
      .or_else(|| std::env::var(&self.token_env).ok())
      .filter(|t| !t.trim().is_empty())
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Default filter directive, overridden by RUST_LOG
  pub level: String,
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "warn".to_string(),
      file: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./relwatch.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/relwatch/config.yaml
  ///
  /// Every setting has a default, so running without any file is fine.
  /// Validation is left to [`Config::with_overrides`] so command-line flags
  /// can correct the file.
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
      None => Ok(Self::default()),
    }
  }

  /// Apply command-line overrides, then validate the result.
  pub fn with_overrides(
    mut self,
    database: Option<PathBuf>,
    token: Option<String>,
    default_owner: Option<String>,
  ) -> Result<Self> {
    if let Some(database) = database {
      self.database = Some(database);
    }
    if let Some(token) = token {
      self.github.token = Some(token);
    }
    if let Some(owner) = default_owner {
      self.default_owner = owner;
    }
    self.validate()?;

    Ok(self)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("relwatch.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("relwatch").join("config.yaml");
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
    // An empty file deserializes to null, not to an empty mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  fn validate(&self) -> Result<()> {
    Url::parse(&self.github.api_url)
      .map_err(|e| eyre!("Invalid github.api_url {:?}: {}", self.github.api_url, e))?;

    if self.github.concurrency == 0 {
      return Err(eyre!("github.concurrency must be at least 1"));
    }

    if self.default_owner.trim().is_empty() || self.default_owner.contains('/') {
      return Err(eyre!("Invalid default_owner {:?}", self.default_owner));
    }

    Ok(())
  }

  /// Database path: configured or the platform default.
  pub fn database_path(&self) -> Result<PathBuf> {
    self
      .database
      .clone()
      .or_else(SqliteStore::default_path)
      .ok_or_else(|| eyre!("Could not determine data directory"))
  }
}
