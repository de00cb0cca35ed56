//! Service catalog
//!
//! Read-only view of every registered provider, its declared dependencies and
//! the state of its token, used by the `graph` command and by diagnostics.

use std::fmt;

/// State of a token's resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Never requested
    Unresolved,
    /// Constructed, initializer not finished
    Pending,
    /// Initialized
    Complete,
    /// Initializer or a required dependency failed; never retried
    Failed,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Unresolved => "unresolved",
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(state)
    }
}

/// One declared dependency of a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    /// Dependency token label
    pub label: String,
    /// Property the dependency is wired into
    pub property: &'static str,
    /// Whether the owner waits for it
    pub required: bool,
}

/// One registered provider
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// Token label
    pub label: String,
    /// Rust type implementing the provider
    pub provider: &'static str,
    /// Current resolution state
    pub state: ServiceState,
    /// Declared dependencies, most-derived first
    pub dependencies: Vec<DependencyInfo>,
}

/// Every registered provider, in registration order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Registered providers
    pub services: Vec<ServiceInfo>,
}

impl Catalog {
    /// Provider registered for `label`
    pub fn find(&self, label: &str) -> Option<&ServiceInfo> {
        self.services.iter().find(|service| service.label == label)
    }

    /// Labels of every registered provider
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|service| service.label.as_str())
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Registered Services:")?;
        for service in &self.services {
            writeln!(f)?;
            writeln!(
                f,
                "\"{}\" [{}] ({})",
                service.label, service.state, service.provider
            )?;
            for dependency in &service.dependencies {
                let kind = if dependency.required {
                    "requires"
                } else {
                    "optional"
                };
                writeln!(
                    f,
                    "  - {kind} \"{}\" as `{}`",
                    dependency.label, dependency.property
                )?;
            }
        }
        Ok(())
    }
}
