//! # Domain Layer
//!
//! Core types of the service graph runtime, free of any async or
//! infrastructure dependency.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error taxonomy shared by every layer |
//! | [`token`] | Capability tokens, resolution paths and the label-interning registry |

pub mod error;
pub mod token;

pub use error::{BoxError, Error, Result, SharedError};
pub use token::{Token, TokenId, TokenKey, TokenPath, TokenRegistry};
