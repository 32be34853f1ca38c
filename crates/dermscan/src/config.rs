//! Configuration management for Dermscan
//!
//! Settings are layered: built-in defaults, then `<data_dir>/config.json`,
//! then explicit overrides (environment variables or CLI flags).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variables read by the CLI flags of the same purpose
pub const HOME_ENV: &str = "DERMSCAN_HOME";
pub const SERVER_URL_ENV: &str = "DERMSCAN_SERVER_URL";
pub const TIMEOUT_ENV: &str = "DERMSCAN_TIMEOUT_SECS";

const CONFIG_FILE: &str = "config.json";
const STORE_FILE: &str = "scans_history.json";
const STAGING_DIR: &str = "cache";

/// Contents of the optional `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
  #[serde(default = "default_server_url")]
  pub server_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_server_url() -> String {
  "http://127.0.0.1:8000".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

impl Default for FileConfig {
  fn default() -> Self {
    Self { server_url: default_server_url(), timeout_secs: default_timeout_secs() }
  }
}

impl FileConfig {
  /// Load from a file, or defaults when the file does not exist
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
      return Ok(Self::default());
    }

    let content = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content)
      .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), message: e.to_string() })
  }
}

/// Values that take precedence over the config file
///
/// The binary fills these from its flags, which fall back to the
/// `DERMSCAN_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
  pub data_dir: Option<PathBuf>,
  pub server_url: Option<String>,
  pub timeout_secs: Option<u64>,
}

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
  /// Base URL of the inference service, without a trailing slash
  pub server_url: String,
  pub timeout_secs: u64,
  pub data_dir: PathBuf,
}

impl Settings {
  pub fn resolve(overrides: SettingsOverrides) -> Result<Self, ConfigError> {
    let data_dir = match overrides.data_dir {
      Some(dir) => dir,
      None => default_data_dir()?,
    };

    let file = FileConfig::load_from_file(data_dir.join(CONFIG_FILE))?;
    let server_url = normalize_server_url(overrides.server_url.as_deref().unwrap_or(&file.server_url))?;
    let timeout_secs = overrides.timeout_secs.unwrap_or(file.timeout_secs);

    Ok(Self { server_url, timeout_secs, data_dir })
  }

  /// The single persisted scan history document
  pub fn store_path(&self) -> PathBuf {
    self.data_dir.join(STORE_FILE)
  }

  /// Where images are copied before upload
  pub fn staging_dir(&self) -> PathBuf {
    self.data_dir.join(STAGING_DIR)
  }
}

/// Get the dermscan data directory (~/.dermscan)
#[cfg(not(tarpaulin_include))] // Skip coverage - depends on the user's home directory
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
  let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
  Ok(home.join(".dermscan"))
}

fn normalize_server_url(raw: &str) -> Result<String, ConfigError> {
  let trimmed = raw.trim().trim_end_matches('/');
  let parsed = Url::parse(trimmed)
    .map_err(|e| ConfigError::InvalidUrl { url: raw.to_string(), message: e.to_string() })?;

  if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
    return Err(ConfigError::InvalidUrl {
      url: raw.to_string(),
      message: "expected an http(s) base url".to_string(),
    });
  }

  Ok(trimmed.to_string())
}
