//! Resolution Engine
//!
//! The container owns the token, provider, descriptor and instance registries
//! behind one lock. A resolution request walks the whole synchronous part of
//! the dependency graph under that lock:
//!
//! 1. reuse the token's state if one exists,
//! 2. otherwise construct the bare instance and insert it as pending,
//! 3. visit each declared dependency the same way and assign its current
//!    instance onto the declaring property.
//!
//! Each newly constructed instance leaves behind a driver that joins the
//! still-pending required dependencies and runs the initializer. Drivers are
//! polled once inline after the lock is released, so a graph without real
//! suspension completes before `resolve` returns; the rest are spawned onto
//! the Tokio runtime and keep running even if the caller stops waiting.
//!
//! A dependency that is an ancestor on the current walk is a cycle back-edge:
//! it is wired but not joined.
//!
//! A panicking initializer fails its own token with an initialization error
//! on either path; the other drivers of the walk keep running.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::Context;

use futures::future::{self, FutureExt};
use futures::task::noop_waker_ref;
use parking_lot::Mutex;
use svcg_domain::{BoxError, Error, Result, Token, TokenId, TokenKey, TokenPath, TokenRegistry};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use super::catalog::{Catalog, DependencyInfo, ServiceInfo};
use super::deferred::{Completion, Settle, deferred};
use super::descriptors::{Descriptor, DescriptorStore};
use super::disposal::{Disposable, DisposalRegistry, DisposalReport};
use super::instances::InstanceRegistry;
use super::resolution::{Resolution, Snapshot, downcast};
use super::service::{InitContext, InitFn, Instance, ProviderEntry, Service};
use crate::config::DisposalConfig;

#[derive(Default)]
struct Registries {
    tokens: TokenRegistry,
    providers: HashMap<TokenId, ProviderEntry>,
    order: Vec<TokenId>,
    descriptors: DescriptorStore,
    instances: InstanceRegistry,
}

#[derive(Default)]
struct Inner {
    registries: Mutex<Registries>,
    disposal: DisposalRegistry,
}

/// Service graph container
///
/// Cloning is cheap; every clone shares the same registries.
#[derive(Clone, Default)]
pub struct Container {
    inner: Arc<Inner>,
}

struct Join {
    property: &'static str,
    completion: Completion,
}

/// Initialization work left behind by one constructed instance
struct Driver {
    key: TokenKey,
    path: TokenPath,
    instance: Instance,
    joins: Vec<Join>,
    init: InitFn,
    settle: Settle,
}

#[derive(Default)]
struct Walk {
    inserted: Vec<TokenId>,
    drivers: Vec<Driver>,
    ancestors: Vec<TokenId>,
}

impl Walk {
    fn rollback(self, registries: &mut Registries) {
        for id in self.inserted {
            registries.instances.remove(id);
        }
    }
}

fn snapshot_of(registries: &Registries, id: TokenId) -> Option<Snapshot> {
    registries.instances.get(id).map(|state| Snapshot {
        instance: Arc::clone(state.instance()),
        completion: state.completion().cloned(),
    })
}

fn visit(
    registries: &mut Registries,
    walk: &mut Walk,
    key: &TokenKey,
    parent: &TokenPath,
) -> Result<Snapshot> {
    if let Some(snapshot) = snapshot_of(registries, key.id()) {
        return Ok(snapshot);
    }

    let path = parent.join(key.shared_label());
    let (factory, descriptors) = match registries.providers.get(&key.id()) {
        Some(ProviderEntry {
            factory: Some(factory),
            descriptors,
            ..
        }) => (*factory, Arc::clone(descriptors)),
        _ => return Err(Error::missing_provider(key.label(), path)),
    };

    debug!(token = %key, path = %path, "constructing");
    let instance = (factory.construct)();
    let (settle, completion) = deferred(key.shared_label());
    registries
        .instances
        .insert_pending(key.id(), Arc::clone(&instance), completion.clone());
    walk.inserted.push(key.id());

    walk.ancestors.push(key.id());
    let joins = wire(registries, walk, &instance, &descriptors, &path);
    walk.ancestors.pop();
    let joins = joins?;

    walk.drivers.push(Driver {
        key: key.clone(),
        path,
        instance: Arc::clone(&instance),
        joins,
        init: factory.init,
        settle,
    });
    Ok(Snapshot {
        instance,
        completion: Some(completion),
    })
}

fn wire(
    registries: &mut Registries,
    walk: &mut Walk,
    instance: &Instance,
    descriptors: &[Descriptor],
    path: &TokenPath,
) -> Result<Vec<Join>> {
    let mut joins = Vec::new();
    for descriptor in descriptors {
        let dependency = visit(registries, walk, descriptor.key(), path)?;
        descriptor.wire(instance, &dependency.instance)?;

        let back_edge = walk.ancestors.contains(&descriptor.key().id());
        if let Some(completion) = dependency.completion
            && descriptor.required()
            && !back_edge
        {
            joins.push(Join {
                property: descriptor.property(),
                completion,
            });
        }
    }
    Ok(joins)
}

fn panic_error(payload: &(dyn Any + Send)) -> BoxError {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string payload".to_string()
    };
    format!("initializer panicked: {message}").into()
}

fn current_runtime(key: &TokenKey) -> Result<Handle> {
    Handle::try_current().map_err(|_| Error::NoRuntime {
        label: key.label().to_string(),
    })
}

impl Container {
    /// Empty container with its own token registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `label` as a token for instances of `T`
    pub fn create_token<T: ?Sized + 'static>(&self, label: &str) -> Result<Token<T>> {
        self.inner.registries.lock().tokens.intern::<T>(label)
    }

    /// Token of `T`'s default label
    pub fn token<T: Service>(&self) -> Result<Token<T>> {
        self.create_token::<T>(T::LABEL)
    }

    /// Register `T` under its default label
    pub fn register<T: Service>(&self) -> Result<Token<T>> {
        let token = self.token::<T>()?;
        self.register_provider(&token)?;
        Ok(token)
    }

    /// Register `T` as the provider of `token`
    pub fn register_provider<T: Service>(&self, token: &Token<T>) -> Result<()> {
        let mut guard = self.inner.registries.lock();
        let registries = &mut *guard;
        Self::check_unregistered(registries, &token.key())?;

        let descriptors = registries.descriptors.collect::<T>(&mut registries.tokens)?;
        registries
            .providers
            .insert(token.id(), ProviderEntry::of::<T>(descriptors));
        registries.order.push(token.id());
        info!(token = %token.label(), provider = type_name::<T>(), "registered provider");
        Ok(())
    }

    /// Register an already initialized instance under `token`
    pub fn provide_value<T: Send + Sync + 'static>(
        &self,
        token: &Token<T>,
        value: Arc<T>,
    ) -> Result<()> {
        let mut registries = self.inner.registries.lock();
        Self::check_unregistered(&registries, &token.key())?;

        registries
            .providers
            .insert(token.id(), ProviderEntry::value::<T>());
        registries.order.push(token.id());
        registries.instances.insert_complete(token.id(), value);
        info!(token = %token.label(), provider = type_name::<T>(), "registered value");
        Ok(())
    }

    fn check_unregistered(registries: &Registries, key: &TokenKey) -> Result<()> {
        if !registries.tokens.contains(key.id()) {
            return Err(Error::UnknownToken {
                label: key.label().to_string(),
            });
        }
        if registries.providers.contains_key(&key.id()) {
            return Err(Error::DuplicateProvider {
                label: key.label().to_string(),
            });
        }
        Ok(())
    }

    /// Resolve `token`, building its dependency graph on first use
    ///
    /// Never blocks. Fails right away when a provider is missing anywhere in
    /// the graph; initialization failures surface through the pending
    /// completion instead.
    pub fn resolve<T: Send + Sync + 'static>(&self, token: &Token<T>) -> Result<Resolution<T>> {
        let snapshot = self.resolve_key(&token.key())?;
        Resolution::from_snapshot(snapshot)
    }

    /// Resolve `token` and wait for its initialization
    pub async fn get<T: Send + Sync + 'static>(&self, token: &Token<T>) -> Result<Arc<T>> {
        self.resolve(token)?.wait().await
    }

    /// Resolve the token labelled `label` and wait for it, whatever its type
    pub async fn ensure(&self, label: &str) -> Result<()> {
        let key = self.inner.registries.lock().tokens.lookup(label);
        let Some(key) = key else {
            return Err(Error::missing_provider(
                label,
                TokenPath::new().join(Arc::from(label)),
            ));
        };
        if let Some(completion) = self.resolve_key(&key)?.completion {
            completion.await?;
        }
        Ok(())
    }

    /// Build a fresh instance of `T` outside the instance registry
    ///
    /// Dependencies are resolved as usual and shared; only the instance
    /// itself is new, and its initializer receives `args`.
    pub async fn create_instance<T: Service>(
        &self,
        token: &Token<T>,
        args: T::Args,
    ) -> Result<Arc<T>> {
        let key = token.key();
        let path = TokenPath::new().join(key.shared_label());

        let (instance, joins, init, drivers, runtime) = {
            let mut registries = self.inner.registries.lock();
            if !registries.tokens.contains(key.id()) {
                return Err(Error::UnknownToken {
                    label: key.label().to_string(),
                });
            }
            let (factory, descriptors) = match registries.providers.get(&key.id()) {
                Some(ProviderEntry {
                    factory: Some(factory),
                    descriptors,
                    ..
                }) => (*factory, Arc::clone(descriptors)),
                _ => return Err(Error::missing_provider(key.label(), path)),
            };
            let runtime = current_runtime(&key)?;

            debug!(token = %key, "constructing fresh instance");
            let instance = (factory.construct)();
            let mut walk = Walk::default();
            match wire(&mut registries, &mut walk, &instance, &descriptors, &path) {
                Ok(joins) => (instance, joins, factory.init, walk.drivers, runtime),
                Err(e) => {
                    walk.rollback(&mut registries);
                    return Err(e);
                }
            }
        };

        self.drive(drivers, &runtime);
        let args: Box<dyn Any + Send> = Box::new(args);
        let instance = self
            .initialize(&key, &path, instance, joins, init, Some(args))
            .await?;
        downcast::<T>(instance)
    }

    pub(crate) fn resolve_key(&self, key: &TokenKey) -> Result<Snapshot> {
        let (drivers, runtime) = {
            let mut registries = self.inner.registries.lock();
            if !registries.tokens.contains(key.id()) {
                return Err(Error::UnknownToken {
                    label: key.label().to_string(),
                });
            }
            if let Some(snapshot) = snapshot_of(&registries, key.id()) {
                return Ok(snapshot);
            }
            let runtime = current_runtime(key)?;

            let mut walk = Walk::default();
            match visit(&mut registries, &mut walk, key, &TokenPath::new()) {
                Ok(_) => (walk.drivers, runtime),
                Err(e) => {
                    walk.rollback(&mut registries);
                    return Err(e);
                }
            }
        };

        self.drive(drivers, &runtime);

        // Re-read: drivers that never suspended already completed the state
        let registries = self.inner.registries.lock();
        snapshot_of(&registries, key.id())
            .ok_or_else(|| Error::internal(format!("resolution state of {key} vanished")))
    }

    /// Poll every driver once; spawn the ones that suspend
    fn drive(&self, drivers: Vec<Driver>, runtime: &Handle) {
        let mut cx = Context::from_waker(noop_waker_ref());
        for driver in drivers {
            let mut task = self.clone().settle(driver).boxed();
            if task.as_mut().poll(&mut cx).is_pending() {
                runtime.spawn(task);
            }
        }
    }

    async fn settle(self, driver: Driver) {
        let Driver {
            key,
            path,
            instance,
            joins,
            init,
            settle,
        } = driver;

        match self.initialize(&key, &path, instance, joins, init, None).await {
            Ok(instance) => {
                self.finalize(&key);
                settle.settle(Ok(instance));
            }
            Err(e) => {
                warn!(token = %key, error = %e, "service failed to initialize");
                settle.settle(Err(e));
            }
        }
    }

    async fn initialize(
        &self,
        key: &TokenKey,
        path: &TokenPath,
        instance: Instance,
        joins: Vec<Join>,
        init: InitFn,
        args: Option<Box<dyn Any + Send>>,
    ) -> Result<Instance> {
        if !joins.is_empty() {
            debug!(token = %key, waiting = joins.len(), "joining required dependencies");
        }
        future::try_join_all(joins.into_iter().map(|join| {
            let context = format!(
                "failed inject property \"{}\" on \"{}\"",
                join.property,
                key.label()
            );
            async move {
                join.completion
                    .await
                    .map_err(|e| e.with_context(context, path))
            }
        }))
        .await?;

        let cx = InitContext::new(self.clone(), key.clone(), path.clone());
        AssertUnwindSafe(init(Arc::clone(&instance), cx, args))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_error(payload.as_ref())))
            .map_err(|e| Error::initialization(path.clone(), key.label(), e))?;
        Ok(instance)
    }

    fn finalize(&self, key: &TokenKey) {
        let outcome = self.inner.registries.lock().instances.complete(key);
        match outcome {
            Ok(()) => debug!(token = %key, "complete"),
            Err(e) => error!(token = %key, error = %e, "finalize rejected"),
        }
    }

    /// Snapshot of every registered provider and its state
    pub fn catalog(&self) -> Catalog {
        let registries = self.inner.registries.lock();
        let services = registries
            .order
            .iter()
            .filter_map(|id| {
                let key = registries.tokens.key(*id)?;
                let entry = registries.providers.get(id)?;
                Some(ServiceInfo {
                    label: key.label().to_string(),
                    provider: entry.type_name,
                    state: registries.instances.state_of(*id),
                    dependencies: entry
                        .descriptors
                        .iter()
                        .map(|descriptor| DependencyInfo {
                            label: descriptor.key().label().to_string(),
                            property: descriptor.property(),
                            required: descriptor.required(),
                        })
                        .collect(),
                })
            })
            .collect();
        Catalog { services }
    }

    /// Labels of tokens whose state never completed
    pub fn unfulfilled(&self) -> Vec<String> {
        let registries = self.inner.registries.lock();
        registries
            .instances
            .pending_ids()
            .into_iter()
            .filter_map(|id| registries.tokens.key(id))
            .map(|key| key.label().to_string())
            .collect()
    }

    /// Register a teardown hook; false if the same instance is already registered
    pub fn register_for_disposal(&self, name: &str, hook: Arc<dyn Disposable>) -> bool {
        self.inner.disposal.register(name, hook)
    }

    /// Run the disposal sweep with default settings
    pub async fn run_disposal(&self) -> DisposalReport {
        self.run_disposal_with(&DisposalConfig::default()).await
    }

    /// Run every teardown hook once and report unfulfilled services
    pub async fn run_disposal_with(&self, config: &DisposalConfig) -> DisposalReport {
        let (disposed, failures) = self.inner.disposal.sweep(config).await;
        let unfulfilled = self.unfulfilled();
        for label in &unfulfilled {
            error!(token = %label, "service not fulfilled");
        }
        DisposalReport {
            disposed,
            failures,
            unfulfilled,
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registries = self.inner.registries.lock();
        f.debug_struct("Container")
            .field("tokens", &registries.tokens.len())
            .field("providers", &registries.providers.len())
            .field("disposables", &self.inner.disposal.len())
            .finish_non_exhaustive()
    }
}
