//! Store and provider scope for the Drive panel state.
//!
//! One [`PanelStore`] is mounted per session scope. Dispatches are serialized
//! through the store's single entry point; every transition is broadcast to
//! all subscribers as a complete snapshot, whether or not the field they care
//! about changed. Stores are created at mount with fixed initial values and
//! dropped at unmount; nothing is persisted.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::watch;

use super::actions::PanelAction;
use super::reducer::reduce;
use super::state::PanelState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PanelError {
    #[error("must be used within a Provider")]
    MissingProvider,
}

pub struct PanelStore {
    tx: watch::Sender<PanelState>,
}

impl PanelStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PanelState::default());
        Self { tx }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PanelState {
        self.tx.borrow().clone()
    }

    /// Apply an action through the reducer and notify every subscriber.
    ///
    /// Transitions are serialized by the watch channel's internal lock, so
    /// concurrent dispatchers never observe a torn update.
    pub fn dispatch(&self, action: &PanelAction) -> PanelState {
        self.tx.send_modify(|state| *state = reduce(state, action));
        self.state()
    }

    /// Apply a tagged JSON action from the wire.
    ///
    /// An unrecognized tag (or malformed payload) is the identity transition:
    /// the state is returned unchanged and no subscriber is notified.
    pub fn dispatch_value(&self, raw: &serde_json::Value) -> PanelState {
        match serde_json::from_value::<PanelAction>(raw.clone()) {
            Ok(action) => self.dispatch(&action),
            Err(err) => {
                tracing::debug!("Ignoring unrecognized panel action: {}", err);
                self.state()
            }
        }
    }

    /// Receiver that observes every future transition.
    pub fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.tx.subscribe()
    }
}

impl Default for PanelStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider registry: explicit scope-to-store lookup, no ambient context.
///
/// Handlers that merely *react* to panel availability (the index pipeline, for
/// instance) treat [`PanelError::MissingProvider`] as "no panel UI attached";
/// the accessor endpoint surfaces it to the caller.
#[derive(Default)]
pub struct PanelRegistry {
    panels: RwLock<HashMap<String, Arc<PanelStore>>>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a fresh provider for `scope`, replacing any previous one.
    ///
    /// Matches the component lifecycle: a remount starts over from the fixed
    /// initial state.
    pub fn mount(&self, scope: &str) -> Arc<PanelStore> {
        let store = Arc::new(PanelStore::new());
        self.panels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scope.to_string(), store.clone());
        store
    }

    /// Drop the provider for `scope`. Returns whether one was mounted.
    pub fn unmount(&self, scope: &str) -> bool {
        self.panels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(scope)
            .is_some()
    }

    /// Consumer accessor: the store for `scope`, or the configuration error
    /// when no provider is mounted there.
    pub fn panel(&self, scope: &str) -> Result<Arc<PanelStore>, PanelError> {
        self.panels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .cloned()
            .ok_or(PanelError::MissingProvider)
    }
}
