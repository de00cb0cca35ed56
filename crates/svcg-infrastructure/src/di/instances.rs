//! Instance Registry
//!
//! Token-keyed table of resolution states. A state is inserted as
//! [`State::Pending`] the moment the bare instance exists and moves to
//! [`State::Complete`] at most once. A pending state whose completion failed
//! stays pending for the rest of the process: later requests observe the
//! failed completion instead of retrying construction.
//!
//! The table holds strong references; services live as long as the container.

use std::collections::HashMap;
use std::sync::Arc;

use svcg_domain::{Error, Result, TokenId, TokenKey};

use super::catalog::ServiceState;
use super::deferred::Completion;
use super::service::Instance;

pub(crate) enum State {
    Pending {
        instance: Instance,
        completion: Completion,
    },
    Complete {
        instance: Instance,
    },
}

impl State {
    pub(crate) fn instance(&self) -> &Instance {
        match self {
            Self::Pending { instance, .. } | Self::Complete { instance } => instance,
        }
    }

    pub(crate) fn completion(&self) -> Option<&Completion> {
        match self {
            Self::Pending { completion, .. } => Some(completion),
            Self::Complete { .. } => None,
        }
    }
}

#[derive(Default)]
pub(crate) struct InstanceRegistry {
    states: HashMap<TokenId, State>,
}

impl InstanceRegistry {
    pub(crate) fn get(&self, id: TokenId) -> Option<&State> {
        self.states.get(&id)
    }

    pub(crate) fn insert_pending(&mut self, id: TokenId, instance: Instance, completion: Completion) {
        self.states.insert(
            id,
            State::Pending {
                instance,
                completion,
            },
        );
    }

    pub(crate) fn insert_complete(&mut self, id: TokenId, instance: Instance) {
        self.states.insert(id, State::Complete { instance });
    }

    /// Pending → Complete; anything else is an engine defect
    pub(crate) fn complete(&mut self, key: &TokenKey) -> Result<()> {
        let state = self
            .states
            .get_mut(&key.id())
            .ok_or_else(|| Error::internal(format!("no resolution state for {key}")))?;
        match state {
            State::Pending { instance, .. } => {
                let instance = Arc::clone(instance);
                *state = State::Complete { instance };
                Ok(())
            }
            State::Complete { .. } => Err(Error::DuplicateFinalize {
                label: key.label().to_string(),
            }),
        }
    }

    /// Drop a state inserted by a graph walk that failed before any initializer ran
    pub(crate) fn remove(&mut self, id: TokenId) {
        self.states.remove(&id);
    }

    pub(crate) fn state_of(&self, id: TokenId) -> ServiceState {
        match self.states.get(&id) {
            None => ServiceState::Unresolved,
            Some(State::Complete { .. }) => ServiceState::Complete,
            Some(State::Pending { completion, .. }) if completion.is_failed() => {
                ServiceState::Failed
            }
            Some(State::Pending { .. }) => ServiceState::Pending,
        }
    }

    /// Tokens that never reached Complete
    pub(crate) fn pending_ids(&self) -> Vec<TokenId> {
        let mut ids: Vec<TokenId> = self
            .states
            .iter()
            .filter(|(_, state)| matches!(state, State::Pending { .. }))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
