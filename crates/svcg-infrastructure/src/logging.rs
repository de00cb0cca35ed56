//! Structured logging with tracing
//!
//! Configures the global subscriber: level or `SVCG_LOG` filter, plain or
//! JSON output, and an optional daily-rotated log file. A scoped stderr
//! subscriber covers the bootstrap that loads that configuration.

use std::ffi::OsStr;
use std::path::Path;

use svcg_domain::{Error, Result};
use tracing::{Dispatch, Level, debug, info};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use crate::config::LoggingConfig;
use crate::constants::{DEFAULT_LOG_FILE_STEM, DEFAULT_LOG_LEVEL, LOG_ENV_FILTER};

/// Initialize logging with the provided configuration
///
/// Fails if the level is invalid or a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter =
        EnvFilter::try_from_env(LOG_ENV_FILTER).unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_appender = config.file_output.as_ref().map(|path| {
        tracing_appender::rolling::daily(
            path.parent().unwrap_or_else(|| Path::new(".")),
            path.file_stem()
                .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE_STEM)),
        )
    });

    // Layer types differ per format, hence the separate branches
    let installed = if config.json_format {
        let stdout = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        let registry = Registry::default().with(filter);
        if let Some(appender) = file_appender {
            let file = fmt::layer()
                .json()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true);
            registry.with(stdout).with(file).try_init()
        } else {
            registry.with(stdout).try_init()
        }
    } else {
        let stdout = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        let registry = Registry::default().with(filter);
        if let Some(appender) = file_appender {
            let file = fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true);
            registry.with(stdout).with(file).try_init()
        } else {
            registry.with(stdout).try_init()
        }
    };
    installed.map_err(|e| Error::configuration_with_source("Logging already initialized", e))?;

    info!("Logging initialized with level: {}", level);
    Ok(())
}

/// Subscriber for events emitted before the configuration is known
///
/// Writes plain lines to stderr at `info` (`debug` when `verbose`), unless
/// `SVCG_LOG` is set. Meant to be scoped with `WithSubscriber` rather than
/// installed globally, so `init_logging` still owns the global subscriber.
pub fn bootstrap_dispatch(verbose: bool) -> Dispatch {
    let level = if verbose { "debug" } else { DEFAULT_LOG_LEVEL };
    let filter = EnvFilter::try_from_env(LOG_ENV_FILTER).unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();
    Dispatch::new(subscriber)
}

/// Parse log level string to tracing Level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(Error::configuration(format!(
            "Invalid log level: {level}. Use trace, debug, info, warn, or error"
        ))),
    }
}

/// Log which configuration file was merged, if any
pub fn log_config_loaded(config_path: Option<&Path>) {
    match config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => debug!("No configuration file found, using defaults and environment"),
    }
}
