//! Synchronous action fan-out
//!
//! Every action reaches the state store first, then each extra sink in
//! registration order, before `dispatch` returns. Dispatches are serialized
//! so that validation and reduction of one action cannot interleave with
//! another.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use labrun_core::{Action, CommandView, Result};
use tracing::trace;

use crate::state_store::StateStore;

/// Receiver of dispatched actions
pub trait ActionSink: Send + Sync {
    fn handle_action(&self, action: &Action);
}

/// The action bus of a run
pub struct ActionDispatcher {
    state: Arc<StateStore>,
    sinks: RwLock<Vec<Arc<dyn ActionSink>>>,
    write_lock: Mutex<()>,
}

impl ActionDispatcher {
    pub fn new(state: Arc<StateStore>) -> Self {
        Self {
            state,
            sinks: RwLock::new(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Register a sink that sees every action after the state store
    pub fn add_sink(&self, sink: Arc<dyn ActionSink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    /// Deliver an action to every sink without validation
    ///
    /// Used for actions produced by the engine itself (command updates,
    /// failures, finish, hardware stopped), which are always legal.
    pub fn dispatch(&self, action: Action) {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.fan_out(&action);
    }

    /// Validate an action against the current state, then deliver it
    ///
    /// # Errors
    ///
    /// Returns the validation error; nothing is dispatched in that case.
    pub fn validate_and_dispatch(&self, action: Action) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let action = self
            .state
            .with_view(|view| view.validate_action_allowed(action))?;
        self.fan_out(&action);
        Ok(())
    }

    /// Deliver an action only if `allowed` holds for the state it would
    /// be reduced against
    ///
    /// The check and the reduction happen under the same write lock, so no
    /// other dispatch can land in between. Returns whether it was delivered.
    pub fn dispatch_if(
        &self,
        action: Action,
        allowed: impl FnOnce(CommandView<'_>) -> bool,
    ) -> bool {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.state.with_view(allowed) {
            trace!(action = action.name(), "conditional dispatch skipped");
            return false;
        }
        self.fan_out(&action);
        true
    }

    fn fan_out(&self, action: &Action) {
        trace!(action = action.name(), "dispatching");
        self.state.handle_action(action);

        // Clone the list so a sink may register another sink re-entrantly.
        let sinks = self
            .sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for sink in sinks {
            sink.handle_action(action);
        }
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sinks = self
            .sinks
            .read()
            .map(|sinks| sinks.len())
            .unwrap_or_default();
        f.debug_struct("ActionDispatcher")
            .field("state", &self.state)
            .field("sinks", &sinks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labrun_core::{Config, DoorState, PauseSource, ProtocolEngineError, QueueStatus};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
    }

    impl ActionSink for Recorder {
        fn handle_action(&self, action: &Action) {
            self.seen.lock().unwrap().push(action.name());
        }
    }

    fn dispatcher() -> ActionDispatcher {
        ActionDispatcher::new(Arc::new(StateStore::new(
            Config::default(),
            DoorState::Closed,
        )))
    }

    #[test]
    fn test_sinks_see_actions_after_state() {
        let dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        dispatcher.add_sink(recorder.clone());

        dispatcher.dispatch(Action::Stop);

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["stop"]);
        assert!(dispatcher.state().with_view(|view| view.get_stop_requested()));
    }

    #[test]
    fn test_rejected_action_reaches_no_sink() {
        let dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        dispatcher.add_sink(recorder.clone());
        let revision = dispatcher.state().revision();

        let result = dispatcher.validate_and_dispatch(Action::Pause {
            source: PauseSource::Client,
        });

        assert_eq!(result, Err(ProtocolEngineError::PauseNotAllowed));
        assert!(recorder.seen.lock().unwrap().is_empty());
        assert_eq!(dispatcher.state().revision(), revision);
        assert_eq!(
            dispatcher.state().with_view(|view| view.get_queue_status()),
            QueueStatus::Setup
        );
    }

    #[test]
    fn test_dispatch_if_checks_current_state() {
        let dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        dispatcher.add_sink(recorder.clone());

        let running = |view: CommandView<'_>| view.get_run_result().is_none();
        assert!(dispatcher.dispatch_if(Action::Stop, running));
        assert!(!dispatcher.dispatch_if(
            Action::Play {
                requested_at: chrono::Utc::now(),
            },
            running,
        ));

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["stop"]);
        assert!(!dispatcher.state().with_view(|view| view.has_been_played()));
    }
}
