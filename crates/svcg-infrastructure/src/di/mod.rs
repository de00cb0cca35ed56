//! Service Graph Runtime
//!
//! Maps capability tokens to providers, builds each requested service's
//! dependency graph on demand, runs every initializer exactly once and tracks
//! teardown hooks.
//!
//! ## Architecture Overview
//!
//! ```text
//! Container
//! ├── TokenRegistry       label → token (svcg-domain)
//! ├── providers           token → construct/init function pointers
//! ├── DescriptorStore     provider type → declared dependencies
//! ├── InstanceRegistry    token → Pending | Complete
//! └── DisposalRegistry    teardown hooks, swept once at exit
//! ```
//!
//! ## Key Principles
//!
//! - **Never blocks**: `resolve` returns the instance or a shared completion
//! - **Exactly once**: one resolution state and one initializer run per token
//! - **Wired early**: dependents hold a dependency's reference before it is
//!   initialized; only required dependencies are awaited

pub mod catalog;
pub mod container;
mod deferred;
pub mod descriptors;
pub mod disposal;
mod instances;
pub mod registry;
pub mod resolution;
pub mod service;

pub use catalog::{Catalog, DependencyInfo, ServiceInfo, ServiceState};
pub use container::Container;
pub use deferred::Completion;
pub use descriptors::{Declarations, Descriptor, Inject, TokenSource};
pub use disposal::{Disposable, DisposalReport};
pub use registry::{SERVICES, ServiceEntry, global, list_services, register_all};
pub use resolution::{PendingService, Resolution};
pub use service::{InitContext, Instance, Service};
