//! # Settings
//!
//! User settings, layered from lowest to highest precedence:
//! 1. built-in defaults
//! 2. `~/.fonz/config.toml` (written with the defaults on first run)
//! 3. `FONZ_`-prefixed environment variables, with `__` between section and key,
//!    e.g. `FONZ_LOOKER__CLIENT_ID` or `FONZ_VALIDATOR__CONCURRENCY`
//!
//! Command line flags are applied on top by the routines.

use config::{Config, ConfigError, Environment, File};
use home::home_dir;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::logger::LoggerSettings;
use crate::framework::validator::ValidatorConfig;
use crate::infrastructure::looker::LookerConfig;
use crate::utilities::constants::{CONFIG_FILE, ENV_PREFIX, USER_DIRECTORY};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write the default config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize the default config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

fn default_concurrency() -> usize {
    10
}

fn default_workers() -> usize {
    4
}

fn default_long_running_threshold_secs() -> f64 {
    5.0
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_poll_batch_size() -> usize {
    100
}

/// The `[validator]` section
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ValidatorSettings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_long_running_threshold_secs")]
    pub long_running_threshold_secs: f64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_batch_size")]
    pub poll_batch_size: usize,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            workers: default_workers(),
            long_running_threshold_secs: default_long_running_threshold_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_batch_size: default_poll_batch_size(),
        }
    }
}

impl ValidatorSettings {
    pub fn to_validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            concurrency: self.concurrency,
            workers: self.workers,
            long_running_threshold: self.long_running_threshold_secs,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_batch_size: self.poll_batch_size,
            fail_fast: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub logger: LoggerSettings,
    #[serde(default)]
    pub looker: LookerConfig,
    #[serde(default)]
    pub validator: ValidatorSettings,
}

pub fn user_directory() -> PathBuf {
    let mut path = home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(USER_DIRECTORY);
    path
}

pub fn config_path() -> PathBuf {
    user_directory().join(CONFIG_FILE)
}

pub fn setup_user_directory() -> Result<(), std::io::Error> {
    std::fs::create_dir_all(user_directory())
}

/// Writes the default settings to `~/.fonz/config.toml` unless the file exists.
pub fn init_config_file() -> Result<(), SettingsError> {
    let path = config_path();
    if !path.exists() {
        let contents = toml::to_string(&Settings::default())?;
        std::fs::write(&path, contents)?;
    }
    Ok(())
}

fn read_settings_from(path: PathBuf) -> Result<Settings, SettingsError> {
    let settings = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()?;
    Ok(settings)
}

pub fn read_settings() -> Result<Settings, SettingsError> {
    read_settings_from(config_path())
}
