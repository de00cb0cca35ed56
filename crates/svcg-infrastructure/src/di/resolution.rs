//! Resolution results
//!
//! A request for a token never blocks. It yields either the completed
//! instance or the stable instance reference together with a future that
//! settles when the instance finished initializing.

use std::any::type_name;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use svcg_domain::{Error, Result};

use super::deferred::Completion;
use super::service::Instance;

/// Erased outcome of a resolution request
pub(crate) struct Snapshot {
    pub(crate) instance: Instance,
    pub(crate) completion: Option<Completion>,
}

pub(crate) fn downcast<T: Send + Sync + 'static>(instance: Instance) -> Result<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| Error::internal(format!("resolved instance is not a `{}`", type_name::<T>())))
}

/// Outcome of [`Container::resolve`](super::Container::resolve)
pub enum Resolution<T> {
    /// Initialization already completed
    Ready(Arc<T>),
    /// Initialization still in flight
    Pending(PendingService<T>),
}

impl<T: Send + Sync + 'static> Resolution<T> {
    pub(crate) fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let instance = downcast::<T>(snapshot.instance)?;
        Ok(match snapshot.completion {
            None => Self::Ready(instance),
            Some(completion) => Self::Pending(PendingService {
                instance,
                completion,
            }),
        })
    }

    /// Whether the instance completed synchronously
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Completed instance, if any
    pub fn ready(&self) -> Option<&Arc<T>> {
        match self {
            Self::Ready(instance) => Some(instance),
            Self::Pending(_) => None,
        }
    }

    /// Instance reference, initialized or not
    ///
    /// The reference is stable: it is the same one the pending variant
    /// eventually completes with.
    pub fn instance(&self) -> &Arc<T> {
        match self {
            Self::Ready(instance) => instance,
            Self::Pending(pending) => &pending.instance,
        }
    }

    /// Wait for initialization to finish
    pub async fn wait(self) -> Result<Arc<T>> {
        match self {
            Self::Ready(instance) => Ok(instance),
            Self::Pending(pending) => pending.wait().await,
        }
    }
}

impl<T: Send + Sync + 'static> IntoFuture for Resolution<T> {
    type Output = Result<Arc<T>>;
    type IntoFuture = BoxFuture<'static, Result<Arc<T>>>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait().boxed()
    }
}

impl<T> fmt::Debug for Resolution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("Resolution::Ready"),
            Self::Pending(_) => f.write_str("Resolution::Pending"),
        }
    }
}

/// Instance whose initialization has not finished yet
pub struct PendingService<T> {
    instance: Arc<T>,
    completion: Completion,
}

impl<T: Send + Sync + 'static> PendingService<T> {
    /// Placeholder reference; fields set by the initializer are not there yet
    pub fn placeholder(&self) -> &Arc<T> {
        &self.instance
    }

    /// Completion future shared with every other waiter
    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    /// Wait for the initializer; yields the same reference as [`Self::placeholder`]
    pub async fn wait(self) -> Result<Arc<T>> {
        self.completion.await?;
        Ok(self.instance)
    }
}
