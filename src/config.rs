use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub upstream: UpstreamConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub retry: RetrySettings,
  /// Where the recalculation snapshot is persisted.
  #[serde(default = "default_snapshot_path")]
  pub snapshot_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
  pub url: String,
  pub login: String,
  /// Per-call timeout in seconds.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// TTL for cached per-status order lists, in minutes.
  #[serde(default = "default_list_ttl_minutes")]
  pub list_ttl_minutes: i64,
  /// How long a summary snapshot may be reused, in seconds.
  #[serde(default = "default_summary_freshness_secs")]
  pub summary_freshness_secs: i64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      list_ttl_minutes: default_list_ttl_minutes(),
      summary_freshness_secs: default_summary_freshness_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
  /// First backoff delay in seconds; attempt n waits n times this.
  #[serde(default = "default_base_delay_secs")]
  pub base_delay_secs: u64,
}

impl Default for RetrySettings {
  fn default() -> Self {
    Self {
      max_attempts: default_max_attempts(),
      base_delay_secs: default_base_delay_secs(),
    }
  }
}

fn default_snapshot_path() -> PathBuf {
  PathBuf::from("durasi-snapshot.json")
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_list_ttl_minutes() -> i64 {
  10
}

fn default_summary_freshness_secs() -> i64 {
  5
}

fn default_max_attempts() -> u32 {
  3
}

fn default_base_delay_secs() -> u64 {
  5
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./durasi.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/durasi/config.yaml
  /// 4. ~/.config/durasi/config.yaml
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
        "No configuration file found. Create one at ~/.config/durasi/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("durasi.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("durasi").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the upstream password from environment variables.
  ///
  /// Checks DURASI_UPSTREAM_PASSWORD first, then UPSTREAM_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var("DURASI_UPSTREAM_PASSWORD")
      .or_else(|_| std::env::var("UPSTREAM_PASSWORD"))
      .map_err(|_| {
        eyre!(
          "Upstream password not found. Set DURASI_UPSTREAM_PASSWORD or UPSTREAM_PASSWORD environment variable."
        )
      })
  }
}
