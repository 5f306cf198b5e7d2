//! Door sensor feed and the task that turns it into actions

use std::sync::Arc;

use labrun_core::{Action, DoorState};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dispatcher::ActionDispatcher;
use crate::hardware::{HardwareApi, PauseType};

/// Source of door open/closed readings
pub trait DoorSensor: Send + Sync {
    fn current(&self) -> DoorState;

    /// Receiver that changes whenever the door state changes
    fn subscribe(&self) -> watch::Receiver<DoorState>;
}

/// In-memory door sensor driven by [`DoorFeed::set`]
///
/// Suitable for simulation and for hosts that already receive door events
/// from elsewhere.
#[derive(Debug, Clone)]
pub struct DoorFeed {
    sender: Arc<watch::Sender<DoorState>>,
}

impl DoorFeed {
    pub fn new(initial: DoorState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn closed() -> Self {
        Self::new(DoorState::Closed)
    }

    /// Publish a new door reading; repeating the current state is ignored
    pub fn set(&self, door_state: DoorState) {
        self.sender.send_if_modified(|current| {
            let changed = *current != door_state;
            *current = door_state;
            changed
        });
    }
}

impl DoorSensor for DoorFeed {
    fn current(&self) -> DoorState {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<DoorState> {
        self.sender.subscribe()
    }
}

/// Background task dispatching `DoorChange` on every sensor change
#[derive(Debug, Default)]
pub struct DoorWatcher {
    task: Option<JoinHandle<()>>,
}

impl DoorWatcher {
    /// Start watching; must be called from within a tokio runtime
    ///
    /// `changes` should be the receiver the state's initial door reading
    /// was taken from (via `borrow_and_update`), so that any change after
    /// that reading is dispatched.
    pub fn start(
        mut changes: watch::Receiver<DoorState>,
        dispatcher: Arc<ActionDispatcher>,
        hardware: HardwareApi,
    ) -> Self {
        let task = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let door_state = *changes.borrow_and_update();
                let was_running = dispatcher.state().with_view(|view| view.get_is_running());

                dispatcher.dispatch(Action::DoorChange { door_state });

                let blocking = dispatcher
                    .state()
                    .with_view(|view| view.get_is_door_blocking());
                debug!(?door_state, blocking, "door changed");
                if blocking && was_running {
                    if let Err(e) = hardware.pause(PauseType::Pause).await {
                        warn!(error = %e, "failed to pause hardware for open door");
                    }
                }
            }
        });
        Self { task: Some(task) }
    }

    /// Stop watching without waiting for the task to wind down
    pub fn stop_soon(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for DoorWatcher {
    fn drop(&mut self) {
        self.stop_soon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_ignores_repeated_state() {
        let feed = DoorFeed::closed();
        let mut receiver = feed.subscribe();

        feed.set(DoorState::Closed);
        assert!(!receiver.has_changed().unwrap());

        feed.set(DoorState::Open);
        assert!(receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow_and_update(), DoorState::Open);
        assert_eq!(feed.current(), DoorState::Open);
    }
}
