//! # svcg
//!
//! Asynchronous service graph runtime: a small inversion-of-control container
//! that maps capability tokens to providers, builds each requested service's
//! dependency graph on demand, runs every provider's initializer exactly once
//! and tears resources down deterministically at exit.
//!
//! ## Example
//!
//! ```ignore
//! use svcg::prelude::*;
//!
//! let container = Container::new();
//! let token = container.register::<SecretReader>()?;
//! match container.resolve(&token)? {
//!     Resolution::Ready(reader) => use_now(reader),
//!     Resolution::Pending(pending) => use_later(pending.wait().await?),
//! }
//! ```
//!
//! ## Architecture
//!
//! - `domain` - Errors, tokens and the token registry
//! - `infrastructure` - Resolution engine, registries, configuration, logging
//! - [`lifecycle`] - Host lifecycle and the teardown sweep
//! - [`services`] - Built-in services
//! - [`cli`] - The `svcg` diagnostic command line

pub mod cli;
pub mod lifecycle;
pub mod services;

/// Domain layer - errors, tokens and the token registry
///
/// Re-exports from the domain crate for convenience
pub mod domain {
    pub use svcg_domain::*;
}

/// Infrastructure layer - runtime, configuration and logging
///
/// Re-exports from the infrastructure crate for convenience
pub mod infrastructure {
    pub use svcg_infrastructure::*;
}

/// Types most programs need
pub mod prelude {
    pub use svcg_domain::{BoxError, Error, Result, Token, TokenPath};
    pub use svcg_infrastructure::di::{
        Container, Declarations, Disposable, InitContext, Inject, Resolution, Service,
    };

    pub use crate::lifecycle::run_main;
}

pub use lifecycle::{Lifecycle, run_main};
pub use svcg_domain::{Error, Result};
pub use svcg_infrastructure::di::{Container, Resolution, Service};
