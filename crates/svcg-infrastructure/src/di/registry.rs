//! Link-time Service Registry
//!
//! Providers defined anywhere in the final binary add themselves to the
//! process-wide container by submitting an entry to [`SERVICES`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  1. Provider defines:  #[linkme::distributed_slice(SERVICES)] │
//! │  2. Linker collects every entry into one slice                │
//! │  3. global() registers each entry on first use                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```ignore
//! #[linkme::distributed_slice(SERVICES)]
//! static CONFIG_READER: ServiceEntry = ServiceEntry {
//!     label: ConfigReader::LABEL,
//!     description: "Loads the runtime configuration",
//!     register: |container| container.register::<ConfigReader>().map(drop),
//! };
//! ```

use std::sync::OnceLock;

use svcg_domain::Result;
use tracing::{debug, info};

use super::container::Container;

/// Registry entry of one link-time provider
pub struct ServiceEntry {
    /// Token label the provider registers under
    pub label: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Registers the provider on a container
    pub register: fn(&Container) -> Result<()>,
}

#[linkme::distributed_slice]
pub static SERVICES: [ServiceEntry] = [..];

/// Apply every link-time entry to `container`, in label order
///
/// Returns the number of providers registered.
pub fn register_all(container: &Container) -> Result<usize> {
    let mut entries: Vec<&ServiceEntry> = SERVICES.iter().collect();
    entries.sort_by_key(|entry| entry.label);
    for entry in &entries {
        debug!(token = entry.label, "registering link-time service");
        (entry.register)(container)?;
    }
    Ok(entries.len())
}

/// List all link-time services
///
/// Returns (label, description) tuples, sorted by label.
pub fn list_services() -> Vec<(&'static str, &'static str)> {
    let mut services: Vec<(&'static str, &'static str)> = SERVICES
        .iter()
        .map(|entry| (entry.label, entry.description))
        .collect();
    services.sort_unstable();
    services
}

static GLOBAL: OnceLock<Result<Container>> = OnceLock::new();

/// Process-wide container with every link-time service registered
pub fn global() -> Result<&'static Container> {
    GLOBAL
        .get_or_init(|| {
            let container = Container::new();
            let registered = register_all(&container)?;
            info!(services = registered, "process container ready");
            Ok(container)
        })
        .as_ref()
        .map_err(Clone::clone)
}
