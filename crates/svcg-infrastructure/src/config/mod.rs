//! Configuration
//!
//! Runtime settings for logging and the disposal sweep, loaded through
//! [`ConfigLoader`].

pub mod loader;
pub mod types;

pub use loader::{ConfigLoader, to_toml};
pub use types::{DisposalConfig, DisposalOrder, LoggingConfig, RuntimeConfig};
