//! Infrastructure layer constants

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "svcg.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "svcg";

/// Environment variable prefix for configuration overrides
pub const CONFIG_ENV_PREFIX: &str = "SVCG";

/// Separator between the prefix and nested keys of environment overrides
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable holding a full `EnvFilter` directive
pub const LOG_ENV_FILTER: &str = "SVCG_LOG";

/// File stem used for log files when the configured path has none
pub const DEFAULT_LOG_FILE_STEM: &str = "svcg";

// ============================================================================
// DISPOSAL CONSTANTS
// ============================================================================

/// Per-hook teardown timeout in milliseconds
pub const DEFAULT_HOOK_TIMEOUT_MS: u64 = 30_000;
