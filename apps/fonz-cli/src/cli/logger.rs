//! # Logger Module
//!
//! Logging for the CLI, built on `tracing-subscriber` layers:
//! - **EnvFilter Layer**: `RUST_LOG` support for module-level filtering. When `RUST_LOG` is
//!   not set, the configured level applies to every module.
//! - **Format Layer**: compact text or JSON, written to stdout or to a daily rolling file
//!   in `~/.fonz/`.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Standard Rust log filtering (e.g., `RUST_LOG=fonz_cli::framework::validator=debug`)
//! - `FONZ_LOGGER__LEVEL`: Log level (DEBUG, INFO, WARN, ERROR)
//! - `FONZ_LOGGER__STDOUT`: Output to stdout vs file (default: `false`)
//! - `FONZ_LOGGER__FORMAT`: Text or Json (default: Text)
//!
//! ## Log Levels
//!
//! - `DEBUG`: individual dispatches, bisections and poll rounds.
//! - `INFO`: run milestones and long-running queries.
//! - `WARN`: skipped explores and bookkeeping anomalies.
//! - `ERROR`: failures that abort a validation run.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::utilities::constants::LOG_FILE_PREFIX;

use super::settings::user_directory;

/// Log files older than this are deleted on startup
const LOG_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum LoggerLevel {
    #[serde(alias = "DEBUG", alias = "debug")]
    Debug,
    #[serde(alias = "INFO", alias = "info")]
    Info,
    #[serde(alias = "WARN", alias = "warn")]
    Warn,
    #[serde(alias = "ERROR", alias = "error")]
    Error,
}

impl LoggerLevel {
    pub fn to_tracing_level(&self) -> LevelFilter {
        match self {
            LoggerLevel::Debug => LevelFilter::DEBUG,
            LoggerLevel::Info => LevelFilter::INFO,
            LoggerLevel::Warn => LevelFilter::WARN,
            LoggerLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum LogFormat {
    #[serde(alias = "json", alias = "JSON")]
    Json,
    #[serde(alias = "text", alias = "TEXT")]
    Text,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggerSettings {
    #[serde(default = "default_log_level")]
    pub level: LoggerLevel,
    #[serde(default = "default_log_stdout")]
    pub stdout: bool,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> LoggerLevel {
    LoggerLevel::Info
}

fn default_log_stdout() -> bool {
    false
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggerSettings {
    fn default() -> Self {
        LoggerSettings {
            level: default_log_level(),
            stdout: default_log_stdout(),
            format: default_log_format(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("Failed to install the log subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

fn clean_old_logs() {
    let Some(cut_off) = SystemTime::now().checked_sub(LOG_RETENTION) else {
        return;
    };

    if let Ok(dir) = user_directory().read_dir() {
        for entry in dir.flatten() {
            let is_log = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
            if !is_log {
                continue;
            }
            match entry.metadata().and_then(|md| md.modified()) {
                Ok(t) if t < cut_off => {
                    let _ = std::fs::remove_file(entry.path());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "Failed to read modification time for {:?}. {}",
                        entry.path(),
                        e
                    )
                }
            }
        }
    }
}

fn env_filter(settings: &LoggerSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.to_tracing_level().to_string()))
}

pub fn setup_logging(settings: &LoggerSettings) -> Result<(), LoggerError> {
    clean_old_logs();

    let env_filter = env_filter(settings);

    if settings.stdout {
        let format_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_level(true);

        if settings.format == LogFormat::Json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(format_layer.json())
                .try_init()?;
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(format_layer.compact())
                .try_init()?;
        }
    } else {
        let file_appender = tracing_appender::rolling::daily(user_directory(), LOG_FILE_PREFIX);
        let format_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(true)
            .with_level(true);

        if settings.format == LogFormat::Json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(format_layer.json())
                .try_init()?;
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(format_layer.compact())
                .try_init()?;
        }
    }

    Ok(())
}
