//! Disposal Registry
//!
//! Teardown hooks registered by initializers, run once at shutdown. The sweep
//! visits every hook even when some fail and reports the failures at the end.

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use svcg_domain::{BoxError, Error};
use tracing::{debug, error, info, warn};

use crate::config::{DisposalConfig, DisposalOrder};

/// Teardown hook of an instance holding external resources
#[async_trait]
pub trait Disposable: Send + Sync {
    /// Release resources; called at most once per registration
    async fn dispose(&self) -> Result<(), BoxError>;
}

struct Entry {
    name: String,
    hook: Arc<dyn Disposable>,
}

/// Ordered set of teardown hooks, de-duplicated by instance identity
#[derive(Default)]
pub(crate) struct DisposalRegistry {
    entries: Mutex<Vec<Entry>>,
}

impl DisposalRegistry {
    /// Add a hook; returns false when the same instance is already registered
    pub(crate) fn register(&self, name: &str, hook: Arc<dyn Disposable>) -> bool {
        let mut entries = self.entries.lock();
        let identity = Arc::as_ptr(&hook).cast::<()>();
        if entries
            .iter()
            .any(|entry| Arc::as_ptr(&entry.hook).cast::<()>() == identity)
        {
            debug!(name, "teardown hook already registered");
            return false;
        }
        entries.push(Entry {
            name: name.to_string(),
            hook,
        });
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Run and drain every registered hook
    pub(crate) async fn sweep(&self, config: &DisposalConfig) -> (usize, Vec<Error>) {
        let mut entries = mem::take(&mut *self.entries.lock());
        if config.order == DisposalOrder::Reverse {
            entries.reverse();
        }

        info!(hooks = entries.len(), order = ?config.order, "running teardown hooks");
        let timeout = (config.hook_timeout_ms > 0)
            .then(|| Duration::from_millis(config.hook_timeout_ms));

        let mut disposed = 0;
        let mut failures = Vec::new();
        for entry in entries {
            debug!(name = %entry.name, "disposing");
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, entry.hook.dispose()).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(format!("timed out after {}ms", limit.as_millis()).into()),
                },
                None => entry.hook.dispose().await,
            };
            match outcome {
                Ok(()) => disposed += 1,
                Err(e) => {
                    warn!(name = %entry.name, error = %e, "teardown hook failed");
                    failures.push(Error::disposal(entry.name, e));
                }
            }
        }

        if !failures.is_empty() {
            error!(failed = failures.len(), "teardown finished with failures");
        }
        (disposed, failures)
    }
}

/// Result of a disposal sweep
#[derive(Debug, Default)]
pub struct DisposalReport {
    /// Hooks that completed successfully
    pub disposed: usize,
    /// Hooks that failed or timed out
    pub failures: Vec<Error>,
    /// Labels of tokens that never completed
    pub unfulfilled: Vec<String>,
}

impl DisposalReport {
    /// No hook failed and every resolved token completed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unfulfilled.is_empty()
    }

    /// Process exit status for this report
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.is_clean())
    }
}

impl fmt::Display for DisposalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Disposed: {}", self.disposed)?;
        if !self.failures.is_empty() {
            writeln!(f, "Teardown failures:")?;
            for failure in &self.failures {
                writeln!(f, "  - {failure}")?;
            }
        }
        if !self.unfulfilled.is_empty() {
            writeln!(f, "Unfulfilled services:")?;
            for label in &self.unfulfilled {
                writeln!(f, "  - \"{label}\"")?;
            }
        }
        Ok(())
    }
}
