//! Error handling types
//!
//! Every failure the runtime can report is a variant of [`Error`]. The type is
//! `Clone` because a single failed initialization is observed by every
//! dependent sharing the same completion future; sources are therefore held
//! behind `Arc` instead of `Box`.

use std::sync::Arc;

use thiserror::Error;

use crate::token::TokenPath;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by provider initializers and teardown hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared, cloneable error source
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Main error type for the service graph runtime
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A token was requested or depended upon but has no registered provider
    #[error("missing dependency: \"{label}\" (resolution path: {path})")]
    MissingProvider {
        /// Label of the token without a provider
        label: String,
        /// Tokens walked from the root request down to the missing one
        path: TokenPath,
    },

    /// A provider's initializer failed, possibly deep in the dependency chain
    #[error("{message}: {source} (resolution path: {path})")]
    Initialization {
        /// Accumulated context, outermost first
        message: String,
        /// Tokens walked from the root request down to the failing one
        path: TokenPath,
        /// The initializer's own error
        #[source]
        source: SharedError,
    },

    /// An already complete resolution state was asked to finalize again
    #[error("duplicate finalize: \"{label}\"")]
    DuplicateFinalize {
        /// Label of the token finalized twice
        label: String,
    },

    /// A teardown hook failed during the disposal sweep
    #[error("teardown of \"{name}\" failed: {source}")]
    Disposal {
        /// Name the instance was registered for disposal under
        name: String,
        /// The hook's own error
        #[source]
        source: SharedError,
    },

    /// The token was not issued by this registry
    #[error("unknown token: \"{label}\" was not issued by this registry")]
    UnknownToken {
        /// Label carried by the foreign token
        label: String,
    },

    /// A provider is already registered for the token
    #[error("provider already registered for \"{label}\"")]
    DuplicateProvider {
        /// Label of the token registered twice
        label: String,
    },

    /// A label was re-declared for a different instance type
    #[error("token \"{label}\" is bound to `{bound}`, not `{requested}`")]
    TokenConflict {
        /// The interned label
        label: String,
        /// Instance type the label was first declared with
        bound: &'static str,
        /// Instance type of the conflicting declaration
        requested: &'static str,
    },

    /// A provider hierarchy declares the same token under two properties
    #[error("`{owner}` declares \"{label}\" as both `{first}` and `{second}`")]
    ConflictingDependency {
        /// Provider type whose declarations conflict
        owner: &'static str,
        /// Label of the dependency token
        label: String,
        /// Property of the most-derived declaration
        first: &'static str,
        /// Property of the conflicting declaration
        second: &'static str,
    },

    /// A completion future was dropped before it settled
    #[error("resolution of \"{label}\" was abandoned before it settled")]
    Abandoned {
        /// Label of the abandoned token
        label: String,
    },

    /// Resolution has to suspend but no async runtime is running
    #[error("no async runtime available to resolve \"{label}\"")]
    NoRuntime {
        /// Label of the requested token
        label: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<SharedError>,
    },

    /// I/O operation error
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
        /// Optional source error
        #[source]
        source: Option<SharedError>,
    },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

// Resolution error creation methods
impl Error {
    /// Create a missing provider error
    pub fn missing_provider<S: Into<String>>(label: S, path: TokenPath) -> Self {
        Self::MissingProvider {
            label: label.into(),
            path,
        }
    }

    /// Wrap an initializer failure for the token `label`
    ///
    /// A source that already is an [`Error::Initialization`] keeps its path and
    /// root cause and only gains the new context.
    pub fn initialization(path: TokenPath, label: &str, source: BoxError) -> Self {
        let context = format!("can not initialize service \"{label}\"");
        match source.downcast::<Error>() {
            Ok(inner) => (*inner).with_context(context, &path),
            Err(other) => Self::Initialization {
                message: context,
                path,
                source: Arc::from(other),
            },
        }
    }

    /// Prefix context onto this error
    ///
    /// Initialization errors are extended in place; any other error becomes
    /// the source of a new initialization error at `path`.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S, path: &TokenPath) -> Self {
        match self {
            Self::Initialization {
                message,
                path,
                source,
            } => Self::Initialization {
                message: format!("{}: {message}", context.into()),
                path,
                source,
            },
            other => Self::Initialization {
                message: context.into(),
                path: path.clone(),
                source: Arc::new(other),
            },
        }
    }

    /// Create a disposal error
    pub fn disposal<S: Into<String>>(name: S, source: BoxError) -> Self {
        Self::Disposal {
            name: name.into(),
            source: Arc::from(source),
        }
    }

    /// Resolution path attached to this error, if any
    pub fn path(&self) -> Option<&TokenPath> {
        match self {
            Self::MissingProvider { path, .. } | Self::Initialization { path, .. } => Some(path),
            _ => None,
        }
    }
}

// Configuration and I/O error creation methods
impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Create an I/O error with source
    pub fn io_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
