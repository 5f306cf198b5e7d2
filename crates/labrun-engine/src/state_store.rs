//! Shared run state with change notification
//!
//! Wraps the single [`CommandStore`] of a run. Reductions are serialized by
//! the dispatcher; readers take a short read lock and see a consistent
//! snapshot. After every reduction the revision counter is bumped so that
//! condition-waits can re-evaluate.

use std::sync::{PoisonError, RwLock};

use labrun_core::{
    Action, CommandState, CommandStore, CommandView, Config, DoorState, ProtocolEngineError,
    Result,
};
use tokio::sync::watch;

use crate::dispatcher::ActionSink;

/// Read side of a run's state, plus the sink that reduces actions into it
#[derive(Debug)]
pub struct StateStore {
    store: RwLock<CommandStore>,
    revision: watch::Sender<u64>,
}

impl StateStore {
    pub fn new(config: Config, door_state: DoorState) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            store: RwLock::new(CommandStore::new(config, door_state)),
            revision,
        }
    }

    /// Run a query against the current state
    ///
    /// The read lock is held for the duration of `f`; do not await inside.
    pub fn with_view<R>(&self, f: impl FnOnce(CommandView<'_>) -> R) -> R {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        f(store.view())
    }

    /// Owned copy of the current state
    pub fn snapshot(&self) -> CommandState {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
            .clone()
    }

    pub fn config(&self) -> Config {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .config()
            .clone()
    }

    /// Number of actions reduced so far
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver that changes after every reduction
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Wait until `condition` yields a value
    ///
    /// The condition is evaluated immediately and then again after each
    /// reduction; it never polls on a timer. Returning `Err` from the
    /// condition ends the wait with that error.
    ///
    /// # Errors
    ///
    /// Returns whatever error the condition returns.
    pub async fn wait_for<T, F>(&self, mut condition: F) -> Result<T>
    where
        F: FnMut(CommandView<'_>) -> Result<Option<T>>,
    {
        // Subscribe before the first check so no reduction can slip between
        // the check and the wait.
        let mut changes = self.revision.subscribe();
        loop {
            if let Some(value) = self.with_view(&mut condition)? {
                return Ok(value);
            }
            changes
                .changed()
                .await
                .map_err(|_| ProtocolEngineError::Internal {
                    message: "state store closed".to_string(),
                })?;
        }
    }
}

impl ActionSink for StateStore {
    fn handle_action(&self, action: &Action) {
        {
            let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
            store.handle_action(action);
        }
        self.revision.send_modify(|revision| *revision += 1);
    }
}
