//! Configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_HOOK_TIMEOUT_MS, DEFAULT_LOG_LEVEL};

/// Root configuration of the runtime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Logging settings
    pub logging: LoggingConfig,

    /// Teardown settings
    pub disposal: DisposalConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON output format
    pub json_format: bool,

    /// Log to a daily-rotated file in addition to stdout
    pub file_output: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json_format: false,
            file_output: None,
        }
    }
}

/// Order teardown hooks run in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisposalOrder {
    /// Last registered first
    #[default]
    Reverse,
    /// First registered first
    Registration,
}

/// Disposal sweep configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisposalConfig {
    /// Hook order
    pub order: DisposalOrder,

    /// Per-hook timeout in milliseconds; 0 waits forever
    pub hook_timeout_ms: u64,
}

impl Default for DisposalConfig {
    fn default() -> Self {
        Self {
            order: DisposalOrder::default(),
            hook_timeout_ms: DEFAULT_HOOK_TIMEOUT_MS,
        }
    }
}
