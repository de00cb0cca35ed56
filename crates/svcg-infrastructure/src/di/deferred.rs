//! Deferred completion shared by every waiter of one resolution state

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use svcg_domain::{Error, Result};
use tracing::debug;

use super::service::Instance;

pub(crate) type Outcome = Result<Instance>;

/// Write side of a deferred completion
pub(crate) struct Settle {
    label: Arc<str>,
    sender: oneshot::Sender<Outcome>,
}

impl Settle {
    /// Settle the completion; later calls are impossible by construction
    pub(crate) fn settle(self, outcome: Outcome) {
        if self.sender.send(outcome).is_err() {
            debug!(token = %self.label, "completion settled with no waiter left");
        }
    }
}

/// Cloneable future settling once the owning state completes or fails
///
/// Dropping the [`Settle`] side without settling resolves every waiter with
/// [`Error::Abandoned`].
#[derive(Clone)]
pub struct Completion {
    inner: Shared<BoxFuture<'static, Outcome>>,
}

impl Completion {
    /// Outcome, if already settled
    pub(crate) fn peek(&self) -> Option<&Outcome> {
        self.inner.peek()
    }

    /// Whether the completion settled with an error
    pub fn is_failed(&self) -> bool {
        matches!(self.peek(), Some(Err(_)))
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

/// Create a linked settle/completion pair for the token `label`
pub(crate) fn deferred(label: Arc<str>) -> (Settle, Completion) {
    let (sender, receiver) = oneshot::channel();
    let abandoned = Arc::clone(&label);
    let inner = receiver
        .map(move |received| {
            received.unwrap_or_else(|_| {
                Err(Error::Abandoned {
                    label: abandoned.to_string(),
                })
            })
        })
        .boxed()
        .shared();
    (Settle { label, sender }, Completion { inner })
}
