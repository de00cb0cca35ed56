//! Dependency Descriptor Store
//!
//! Providers declare their dependency properties once, in
//! [`Service::declare`](super::Service::declare). The declarations of a
//! provider type, including those of embedded base providers pulled in with
//! [`Declarations::inherit`], are collected into a side table keyed by type
//! identity and reused for every instance of that type.
//!
//! ```text
//! SecretReader::declare            base: CachedReader::declare
//! ─────────────────────            ───────────────────────────
//! require "Config Reader" config   require "Config Reader" config   (merged)
//! optional "Gpg Agent" agent       require "Temp Dir" tmp
//!                   │
//!                   ▼
//! ["Config Reader" (required, 2 slots), "Gpg Agent" (optional), "Temp Dir" (required)]
//! ```

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use svcg_domain::{Error, Result, Token, TokenKey, TokenRegistry};

use super::service::{Instance, Service};

/// Set-once dependency property
///
/// The engine assigns the dependency's instance exactly once while wiring,
/// before the owner's initializer runs. The assigned instance may itself still
/// be pending; it is only guaranteed to be initialized for required,
/// non-cyclic dependencies.
pub struct Inject<T> {
    slot: OnceLock<Arc<T>>,
}

impl<T> Inject<T> {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Injected instance, once wired
    pub fn get(&self) -> Option<&T> {
        self.slot.get().map(AsRef::as_ref)
    }

    /// Shared handle to the injected instance
    pub fn shared(&self) -> Option<Arc<T>> {
        self.slot.get().cloned()
    }

    /// Whether the engine already assigned this property
    pub fn is_wired(&self) -> bool {
        self.slot.get().is_some()
    }

    fn wire(&self, value: Arc<T>) -> bool {
        self.slot.set(value).is_ok()
    }
}

impl<T> Default for Inject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("type", &type_name::<T>())
            .field("wired", &self.is_wired())
            .finish()
    }
}

/// Anything that names the token of a dependency
pub trait TokenSource<D: ?Sized> {
    /// Turn this into a token issued by `tokens`
    fn into_token(self, tokens: &mut TokenRegistry) -> Result<Token<D>>;
}

impl<D: ?Sized + 'static> TokenSource<D> for &str {
    fn into_token(self, tokens: &mut TokenRegistry) -> Result<Token<D>> {
        tokens.intern::<D>(self)
    }
}

impl<D: ?Sized + 'static> TokenSource<D> for &Token<D> {
    fn into_token(self, tokens: &mut TokenRegistry) -> Result<Token<D>> {
        if tokens.contains(self.id()) {
            Ok(self.clone())
        } else {
            Err(Error::UnknownToken {
                label: self.label().to_string(),
            })
        }
    }
}

type Assign<S> = Arc<dyn Fn(&S, &Instance) -> Result<()> + Send + Sync>;
type ErasedAssign = Arc<dyn Fn(&Instance, &Instance) -> Result<()> + Send + Sync>;

struct Declared<S> {
    key: TokenKey,
    property: &'static str,
    required: bool,
    depth: usize,
    assign: Assign<S>,
}

/// Builder receiving a provider's dependency declarations
pub struct Declarations<'a, S> {
    tokens: &'a mut TokenRegistry,
    depth: usize,
    declared: Vec<Declared<S>>,
    error: Option<Error>,
}

impl<'a, S: Send + Sync + 'static> Declarations<'a, S> {
    pub(crate) fn new(tokens: &'a mut TokenRegistry) -> Self {
        Self {
            tokens,
            depth: 0,
            declared: Vec::new(),
            error: None,
        }
    }

    /// Declare a required dependency
    ///
    /// The owner's initializer does not run before the dependency completed.
    pub fn require<D, K>(
        &mut self,
        token: K,
        property: &'static str,
        slot: fn(&S) -> &Inject<D>,
    ) -> &mut Self
    where
        D: Send + Sync + 'static,
        K: TokenSource<D>,
    {
        self.declare(token, property, true, slot)
    }

    /// Declare an optional dependency
    ///
    /// The property is wired with whatever state the dependency is in; its
    /// completion is not awaited and its failure does not propagate.
    pub fn optional<D, K>(
        &mut self,
        token: K,
        property: &'static str,
        slot: fn(&S) -> &Inject<D>,
    ) -> &mut Self
    where
        D: Send + Sync + 'static,
        K: TokenSource<D>,
    {
        self.declare(token, property, false, slot)
    }

    /// Pull in the declarations of an embedded base provider
    pub fn inherit<B: Service>(&mut self, base: fn(&S) -> &B) -> &mut Self {
        if self.error.is_some() {
            return self;
        }

        let mut nested = Declarations::<B> {
            tokens: &mut *self.tokens,
            depth: self.depth + 1,
            declared: Vec::new(),
            error: None,
        };
        B::declare(&mut nested);
        let Declarations {
            declared, error, ..
        } = nested;

        if let Some(error) = error {
            self.error = Some(error);
            return self;
        }
        for declared in declared {
            let inner = declared.assign;
            self.declared.push(Declared {
                key: declared.key,
                property: declared.property,
                required: declared.required,
                depth: declared.depth,
                assign: Arc::new(move |owner: &S, dependency: &Instance| {
                    inner(base(owner), dependency)
                }),
            });
        }
        self
    }

    fn declare<D, K>(
        &mut self,
        token: K,
        property: &'static str,
        required: bool,
        slot: fn(&S) -> &Inject<D>,
    ) -> &mut Self
    where
        D: Send + Sync + 'static,
        K: TokenSource<D>,
    {
        if self.error.is_some() {
            return self;
        }

        match token.into_token(self.tokens) {
            Ok(token) => {
                let label = token.key();
                let assign: Assign<S> = Arc::new(move |owner: &S, dependency: &Instance| {
                    let value = Arc::clone(dependency).downcast::<D>().map_err(|_| {
                        Error::internal(format!(
                            "property `{property}` expects a `{}`",
                            type_name::<D>()
                        ))
                    })?;
                    if slot(owner).wire(value) {
                        Ok(())
                    } else {
                        Err(Error::internal(format!("property `{property}` is already wired")))
                    }
                });
                self.declared.push(Declared {
                    key: label,
                    property,
                    required,
                    depth: self.depth,
                    assign,
                });
            }
            Err(error) => self.error = Some(error),
        }
        self
    }

    /// De-duplicate by token, most-derived declaration first
    pub(crate) fn finish(self) -> Result<Vec<Descriptor>> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut declared = self.declared;
        declared.sort_by_key(|d| d.depth);

        let mut descriptors: Vec<Descriptor> = Vec::with_capacity(declared.len());
        for d in declared {
            let assign = erase(d.assign);
            match descriptors.iter_mut().find(|existing| existing.key == d.key) {
                Some(existing) if existing.property != d.property => {
                    return Err(Error::ConflictingDependency {
                        owner: type_name::<S>(),
                        label: d.key.label().to_string(),
                        first: existing.property,
                        second: d.property,
                    });
                }
                Some(existing) => existing.assign.push(assign),
                None => descriptors.push(Descriptor {
                    key: d.key,
                    property: d.property,
                    required: d.required,
                    assign: vec![assign],
                }),
            }
        }
        Ok(descriptors)
    }
}

fn erase<S: Send + Sync + 'static>(assign: Assign<S>) -> ErasedAssign {
    Arc::new(move |owner: &Instance, dependency: &Instance| {
        let owner = (**owner).downcast_ref::<S>().ok_or_else(|| {
            Error::internal(format!("owner is not a `{}`", type_name::<S>()))
        })?;
        assign(owner, dependency)
    })
}

/// One de-duplicated dependency edge of a provider type
#[derive(Clone)]
pub struct Descriptor {
    key: TokenKey,
    property: &'static str,
    required: bool,
    assign: Vec<ErasedAssign>,
}

impl Descriptor {
    /// Dependency token
    pub fn key(&self) -> &TokenKey {
        &self.key
    }

    /// Property the dependency is assigned to
    pub fn property(&self) -> &'static str {
        self.property
    }

    /// Whether the owner waits for the dependency to complete
    pub fn required(&self) -> bool {
        self.required
    }

    /// Assign `dependency` to every slot declared for this token on `owner`
    pub(crate) fn wire(&self, owner: &Instance, dependency: &Instance) -> Result<()> {
        self.assign
            .iter()
            .try_for_each(|assign| assign(owner, dependency))
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("token", &self.key)
            .field("property", &self.property)
            .field("required", &self.required)
            .field("slots", &self.assign.len())
            .finish()
    }
}

/// Side table of collected descriptors, keyed by provider type
#[derive(Default)]
pub(crate) struct DescriptorStore {
    by_type: HashMap<TypeId, Arc<[Descriptor]>>,
}

impl DescriptorStore {
    /// Descriptors of `S`, collected on first use
    pub(crate) fn collect<S: Service>(
        &mut self,
        tokens: &mut TokenRegistry,
    ) -> Result<Arc<[Descriptor]>> {
        if let Some(found) = self.by_type.get(&TypeId::of::<S>()) {
            return Ok(Arc::clone(found));
        }

        let mut declarations = Declarations::<S>::new(tokens);
        S::declare(&mut declarations);
        let descriptors: Arc<[Descriptor]> = declarations.finish()?.into();
        self.by_type
            .insert(TypeId::of::<S>(), Arc::clone(&descriptors));
        Ok(descriptors)
    }
}
