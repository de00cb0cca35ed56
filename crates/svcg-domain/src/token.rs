//! Capability tokens and the token registry
//!
//! A [`Token<T>`] names a capability whose instances have type `T`. Tokens are
//! interned by label: declaring the same label twice yields the same token, so
//! code in unrelated modules can agree on a capability by name. The label is
//! kept for diagnostics only; identity is the process-unique [`TokenId`].

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique token identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u64);

impl TokenId {
    fn next() -> Self {
        Self(NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Typed handle naming a capability that resolves to `T`
pub struct Token<T: ?Sized> {
    id: TokenId,
    label: Arc<str>,
    marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized> Token<T> {
    /// Token identity
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// Human-readable label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Type-erased form of this token
    pub fn key(&self) -> TokenKey {
        TokenKey {
            id: self.id,
            label: Arc::clone(&self.label),
        }
    }
}

impl<T: ?Sized> Clone for Token<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            label: Arc::clone(&self.label),
            marker: PhantomData,
        }
    }
}

impl<T: ?Sized> PartialEq for Token<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: ?Sized> Eq for Token<T> {}

impl<T: ?Sized> Hash for Token<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: ?Sized> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("type", &type_name::<T>())
            .finish()
    }
}

impl<T: ?Sized> fmt::Display for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.label)
    }
}

/// Type-erased token: identity plus label
#[derive(Debug, Clone)]
pub struct TokenKey {
    id: TokenId,
    label: Arc<str>,
}

impl TokenKey {
    /// Token identity
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// Human-readable label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Shared label, cheap to clone into paths
    pub fn shared_label(&self) -> Arc<str> {
        Arc::clone(&self.label)
    }
}

impl PartialEq for TokenKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TokenKey {}

impl Hash for TokenKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.label)
    }
}

/// Chain of token labels from a root resolution request down to a token
///
/// Rendered as `"Program Arguments" -> "Config Reader" -> "Secret Reader"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPath(Vec<Arc<str>>);

impl TokenPath {
    /// Empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this path extended by `label`
    #[must_use]
    pub fn join(&self, label: Arc<str>) -> Self {
        let mut labels = self.0.clone();
        labels.push(label);
        Self(labels)
    }

    /// Labels from root to leaf
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(AsRef::as_ref)
    }

    /// Number of tokens in the path
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TokenPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| Arc::from(s.as_ref())).collect())
    }
}

impl fmt::Display for TokenPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (index, label) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "\"{label}\"")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Binding {
    key: TokenKey,
    type_id: TypeId,
    type_name: &'static str,
}

/// Label-interning table issuing tokens
///
/// Interning is explicit and typed: a label is bound to the instance type it
/// was first declared with, and re-declaring it for another type fails with
/// [`Error::TokenConflict`] instead of silently aliasing two capabilities.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    by_label: HashMap<Arc<str>, Binding>,
    by_id: HashMap<TokenId, Binding>,
}

impl TokenRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the token for `label`, or return the one already interned
    pub fn intern<T: ?Sized + 'static>(&mut self, label: &str) -> Result<Token<T>> {
        if let Some(binding) = self.by_label.get(label) {
            if binding.type_id != TypeId::of::<T>() {
                return Err(Error::TokenConflict {
                    label: label.to_string(),
                    bound: binding.type_name,
                    requested: type_name::<T>(),
                });
            }
            return Ok(Token {
                id: binding.key.id,
                label: binding.key.shared_label(),
                marker: PhantomData,
            });
        }

        let label: Arc<str> = Arc::from(label);
        let binding = Binding {
            key: TokenKey {
                id: TokenId::next(),
                label: Arc::clone(&label),
            },
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        };
        let token = Token {
            id: binding.key.id,
            label: Arc::clone(&label),
            marker: PhantomData,
        };
        self.by_id.insert(token.id, binding.clone());
        self.by_label.insert(label, binding);
        Ok(token)
    }

    /// Erased token interned for `label`
    pub fn lookup(&self, label: &str) -> Option<TokenKey> {
        self.by_label.get(label).map(|binding| binding.key.clone())
    }

    /// Whether this registry issued `id`
    pub fn contains(&self, id: TokenId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Erased token for `id`
    pub fn key(&self, id: TokenId) -> Option<TokenKey> {
        self.by_id.get(&id).map(|binding| binding.key.clone())
    }

    /// Instance type name a token was declared with
    pub fn type_name(&self, id: TokenId) -> Option<&'static str> {
        self.by_id.get(&id).map(|binding| binding.type_name)
    }

    /// Every issued token, in issue order
    pub fn keys(&self) -> Vec<TokenKey> {
        let mut keys: Vec<TokenKey> = self.by_id.values().map(|b| b.key.clone()).collect();
        keys.sort_by_key(TokenKey::id);
        keys
    }

    /// Number of issued tokens
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether no token was issued yet
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
