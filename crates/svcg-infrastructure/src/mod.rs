//! # Infrastructure Layer
//!
//! The service graph runtime and the cross-cutting concerns around it.
//!
//! ### Runtime
//! | Module | Description |
//! |--------|-------------|
//! | [`di`] | Resolution engine, registries, link-time service catalog |
//!
//! ### Configuration
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Figment-layered TOML/env configuration |
//! | [`constants`] | Centralized configuration constants |
//!
//! ### Observability
//! | Module | Description |
//! |--------|-------------|
//! | [`logging`] | Structured logging with tracing |

pub mod config;
pub mod constants;
pub mod di;
pub mod error_ext;
pub mod logging;

pub use error_ext::ErrorContext;
