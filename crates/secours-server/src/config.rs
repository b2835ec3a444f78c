//! Server configuration.
//!
//! Read from a TOML file layered under `SECOURS_*` environment variables.
//! Nested keys use a double underscore, e.g. `SECOURS_PUSH__ENABLED=true`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;

/// Top-level server configuration, deserialised from config.toml.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  pub auth_username:      String,
  /// PHC string produced by `secours-server --hash-password`.
  pub auth_password_hash: String,
  #[serde(default)]
  pub push:               PushConfig,
}

/// Settings for the external push provider.
#[derive(Clone, Debug, Deserialize)]
pub struct PushConfig {
  /// With push disabled, notifications are still recorded but never pushed.
  #[serde(default)]
  pub enabled:      bool,
  #[serde(default)]
  pub url:          String,
  #[serde(default)]
  pub app_id:       String,
  #[serde(default)]
  pub api_key:      String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for PushConfig {
  fn default() -> Self {
    Self {
      enabled:      false,
      url:          String::new(),
      app_id:       String::new(),
      api_key:      String::new(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl PushConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  /// An enabled provider needs somewhere to send to and something to send as.
  pub fn validate(&self) -> Result<(), String> {
    if !self.enabled {
      return Ok(());
    }
    for (key, value) in [
      ("push.url", &self.url),
      ("push.app_id", &self.app_id),
      ("push.api_key", &self.api_key),
    ] {
      if value.trim().is_empty() {
        return Err(format!("{key} is required when push is enabled"));
      }
    }
    if self.timeout_secs == 0 {
      return Err("push.timeout_secs must be positive".into());
    }
    Ok(())
  }
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("secours.db") }

fn default_timeout_secs() -> u64 { 5 }

impl ServerConfig {
  /// Build the layered configuration: the optional TOML file, then the
  /// environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::from_builder(
      config::Config::builder()
        .add_source(config::File::from(path).required(false)),
    )
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> Result<Self, config::ConfigError> {
    let cfg: Self = builder
      .add_source(
        config::Environment::with_prefix("SECOURS")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()?;
    cfg.push.validate().map_err(config::ConfigError::Message)?;
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
