//! Configuration loader
//!
//! Layers defaults, a TOML file and `SVCG__` environment overrides with
//! Figment.

use std::env;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use svcg_domain::{Error, Result};

use crate::config::RuntimeConfig;
use crate::constants::{
    CONFIG_ENV_PREFIX, CONFIG_ENV_SEPARATOR, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME,
};
use crate::error_ext::ErrorContext;
use crate::logging::{log_config_loaded, parse_log_level};

/// Configuration loader service
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    #[must_use]
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from all sources
    ///
    /// Sources are merged in this order (later sources override earlier):
    /// 1. `RuntimeConfig::default()`
    /// 2. TOML file: the explicit path, or the first default location found
    /// 3. Environment variables such as `SVCG__LOGGING__LEVEL=debug`
    pub fn load(&self) -> Result<RuntimeConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(RuntimeConfig::default()));

        match &self.config_path {
            Some(config_path) if config_path.exists() => {
                figment = figment.merge(Toml::file(config_path));
                log_config_loaded(Some(config_path.as_path()));
            }
            Some(config_path) => {
                return Err(Error::configuration(format!(
                    "Configuration file not found: {}",
                    config_path.display()
                )));
            }
            None => {
                let default_path = Self::find_default_config_path();
                if let Some(default_path) = &default_path {
                    figment = figment.merge(Toml::file(default_path));
                }
                log_config_loaded(default_path.as_deref());
            }
        }

        figment = figment.merge(
            Env::prefixed(&format!("{CONFIG_ENV_PREFIX}{CONFIG_ENV_SEPARATOR}"))
                .split(CONFIG_ENV_SEPARATOR),
        );

        let config: RuntimeConfig = figment
            .extract()
            .config_context("Failed to extract configuration")?;

        validate_runtime_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &RuntimeConfig, path: P) -> Result<()> {
        let toml_string = to_toml(config)?;
        std::fs::write(path.as_ref(), toml_string).io_context(format!(
            "Failed to write config file {}",
            path.as_ref().display()
        ))
    }

    /// Get the current configuration file path
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    fn find_default_config_path() -> Option<PathBuf> {
        let current_dir = env::current_dir().ok()?;

        let mut candidates = vec![
            current_dir.join(DEFAULT_CONFIG_FILENAME),
            current_dir
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME),
        ];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME));
        }

        candidates.into_iter().find(|path| path.exists())
    }
}

/// Render a configuration as pretty TOML
pub fn to_toml(config: &RuntimeConfig) -> Result<String> {
    toml::to_string_pretty(config).config_context("Failed to serialize config to TOML")
}

fn validate_runtime_config(config: &RuntimeConfig) -> Result<()> {
    parse_log_level(&config.logging.level)?;
    if let Some(path) = &config.logging.file_output
        && path.as_os_str().is_empty()
    {
        return Err(Error::configuration("Log file path cannot be empty"));
    }
    Ok(())
}
