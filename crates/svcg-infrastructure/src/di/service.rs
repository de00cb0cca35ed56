//! Provider contract
//!
//! A provider is a type implementing [`Service`]. The engine builds it bare
//! with [`Service::construct`], wires the properties declared in
//! [`Service::declare`], waits for the required ones, then runs
//! [`Service::init`] exactly once per instance.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use svcg_domain::{BoxError, Error, TokenKey, TokenPath};

use super::container::Container;
use super::descriptors::{Declarations, Descriptor};
use super::disposal::Disposable;

/// Type-erased service instance
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A provider the container can construct, wire and initialize
///
/// Initializers merge their results into the instance in place (through
/// `OnceLock` or similar interior mutability), so dependents that captured the
/// instance while it was pending observe the initialized fields without the
/// reference ever changing.
///
/// # Example
///
/// ```ignore
/// struct SecretReader {
///     config: Inject<ConfigReader>,
///     key: OnceLock<String>,
/// }
///
/// #[async_trait]
/// impl Service for SecretReader {
///     const LABEL: &'static str = "Secret Reader";
///     type Args = ();
///
///     fn construct() -> Self {
///         Self { config: Inject::new(), key: OnceLock::new() }
///     }
///
///     fn declare(deps: &mut Declarations<'_, Self>) {
///         deps.require("Config Reader", "config", |s| &s.config);
///     }
///
///     async fn init(self: Arc<Self>, _cx: InitContext, _args: ()) -> Result<(), BoxError> {
///         let _ = self.key.set(read_key().await?);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + Sized + 'static {
    /// Label of the token this provider registers under by default
    const LABEL: &'static str;

    /// Arguments accepted by [`Service::init`]; singletons get `Default::default()`
    type Args: Default + Send + 'static;

    /// Bare construction, without side effects
    fn construct() -> Self;

    /// Declare dependency properties
    fn declare(_deps: &mut Declarations<'_, Self>) {}

    /// Asynchronous initialization, run once all required dependencies completed
    async fn init(self: Arc<Self>, _cx: InitContext, _args: Self::Args) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Handle passed to initializers
#[derive(Clone)]
pub struct InitContext {
    container: Container,
    key: TokenKey,
    path: TokenPath,
}

impl InitContext {
    pub(crate) fn new(container: Container, key: TokenKey, path: TokenPath) -> Self {
        Self {
            container,
            key,
            path,
        }
    }

    /// Container the instance is being resolved from
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Label of the token being initialized
    pub fn label(&self) -> &str {
        self.key.label()
    }

    /// Resolution path leading to this initialization
    pub fn path(&self) -> &TokenPath {
        &self.path
    }

    /// Register a teardown hook under this token's label
    pub fn register_for_disposal(&self, hook: Arc<dyn Disposable>) -> bool {
        self.container.register_for_disposal(self.key.label(), hook)
    }
}

impl fmt::Debug for InitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitContext")
            .field("token", &self.key)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

pub(crate) type InitFn =
    fn(Instance, InitContext, Option<Box<dyn Any + Send>>) -> BoxFuture<'static, Result<(), BoxError>>;

/// Construction and initialization of one provider type, erased to function pointers
#[derive(Clone, Copy)]
pub(crate) struct Factory {
    pub(crate) construct: fn() -> Instance,
    pub(crate) init: InitFn,
}

/// Registered provider
///
/// Pre-built values have no factory: their state is complete from the moment
/// they are registered.
pub(crate) struct ProviderEntry {
    pub(crate) type_name: &'static str,
    pub(crate) factory: Option<Factory>,
    pub(crate) descriptors: Arc<[Descriptor]>,
}

impl ProviderEntry {
    pub(crate) fn of<T: Service>(descriptors: Arc<[Descriptor]>) -> Self {
        Self {
            type_name: type_name::<T>(),
            factory: Some(Factory {
                construct: construct_erased::<T>,
                init: init_erased::<T>,
            }),
            descriptors,
        }
    }

    pub(crate) fn value<T: Send + Sync + 'static>() -> Self {
        Self {
            type_name: type_name::<T>(),
            factory: None,
            descriptors: Arc::from(Vec::new()),
        }
    }
}

fn construct_erased<T: Service>() -> Instance {
    Arc::new(T::construct())
}

fn init_erased<T: Service>(
    instance: Instance,
    cx: InitContext,
    args: Option<Box<dyn Any + Send>>,
) -> BoxFuture<'static, Result<(), BoxError>> {
    Box::pin(async move {
        let instance = instance
            .downcast::<T>()
            .map_err(|_| Error::internal(format!("instance is not a `{}`", type_name::<T>())))?;
        let args = match args {
            Some(args) => *args.downcast::<T::Args>().map_err(|_| {
                Error::internal(format!("init arguments do not match `{}`", type_name::<T>()))
            })?,
            None => T::Args::default(),
        };
        instance.init(cx, args).await
    })
}
