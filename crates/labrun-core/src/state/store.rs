//! The command store and its reducer
//!
//! `handle_action` is the only way run state changes. It is a plain function
//! of `(state, action)`: no clock reads, no id generation, no I/O. Callers
//! are expected to validate actions through the view first; the reducer
//! itself never fails, and actions that make no sense for the current state
//! (for example a second Stop) leave the state untouched.
//!
//! ## Fail cascade
//!
//! When a command fails, every command still waiting in the *same* queue
//! fails with it (without an error of its own). Setup and protocol queues
//! never affect each other.

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::{CommandState, QueueStatus, RunResult};
use crate::actions::{Action, DoorState, FinishErrorDetails};
use crate::config::Config;
use crate::model::{Command, CommandCreate, CommandIntent, CommandStatus, ErrorInfo};
use crate::queries::CommandView;

/// Owner of a run's [`CommandState`]
#[derive(Debug, Clone)]
pub struct CommandStore {
    state: CommandState,
    config: Config,
}

impl CommandStore {
    /// Create the store for a new run
    pub fn new(config: Config, door_state: DoorState) -> Self {
        Self {
            state: CommandState::new(door_state.is_open()),
            config,
        }
    }

    pub fn state(&self) -> &CommandState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read-only queries over the current state
    pub fn view(&self) -> CommandView<'_> {
        CommandView::new(&self.state)
    }

    /// Apply one action to the state
    pub fn handle_action(&mut self, action: &Action) {
        trace!(action = action.name(), "reducing action");

        match action {
            Action::QueueCommand {
                request,
                command_id,
                created_at,
            } => self.queue_command(request, command_id, *created_at),
            Action::UpdateCommand { command } => self.update_command(command),
            Action::FailCommand {
                command_id,
                error_id,
                error,
                failed_at,
            } => self.fail_command(command_id, error_id, error, *failed_at),
            Action::Play { requested_at } => self.play(*requested_at),
            Action::Pause { .. } => {
                self.state.queue_status = QueueStatus::Paused;
            }
            Action::Stop => self.end_run(RunResult::Stopped, None),
            Action::Finish {
                error_details,
                set_run_status,
            } => {
                let result = match (set_run_status, error_details) {
                    (false, _) => RunResult::Stopped,
                    (true, Some(_)) => RunResult::Failed,
                    (true, None) => RunResult::Succeeded,
                };
                self.end_run(result, error_details.as_ref());
            }
            Action::HardwareStopped { completed_at } => {
                self.state.queue_status = QueueStatus::Paused;
                self.state.run_completed_at.get_or_insert(*completed_at);
                self.state.run_result.get_or_insert(RunResult::Stopped);
            }
            Action::DoorChange { door_state } => self.door_change(*door_state),
        }
    }

    fn queue_command(
        &mut self,
        request: &CommandCreate,
        command_id: &str,
        created_at: DateTime<Utc>,
    ) {
        let command = Command::queued(request, command_id, created_at);
        let id = command.id.clone();
        let intent = command.intent;
        // A re-queued id must not linger in the other queue.
        self.state.dequeue(&id);
        self.state.upsert_command(command);

        match intent {
            CommandIntent::Setup => self.state.queued_setup_command_ids.add(id),
            CommandIntent::Protocol => self.state.queued_command_ids.add(id),
        };
    }

    fn update_command(&mut self, command: &Command) {
        let mut command = command.clone();
        let previous_started_at = self
            .state
            .commands_by_id
            .get(&command.id)
            .and_then(|entry| entry.command.started_at);

        self.state.dequeue(&command.id);

        if command.status == CommandStatus::Running {
            if command.started_at.is_none() {
                command.started_at = Some(previous_started_at.unwrap_or(command.created_at));
            }
            self.state.running_command_id = Some(command.id.clone());
        } else if command.status.is_terminal()
            && self.state.running_command_id.as_deref() == Some(command.id.as_str())
        {
            self.state.running_command_id = None;
        }

        self.state.upsert_command(command);
    }

    fn fail_command(
        &mut self,
        command_id: &str,
        error_id: &str,
        error: &ErrorInfo,
        failed_at: DateTime<Utc>,
    ) {
        let Some(entry) = self.state.commands_by_id.get_mut(command_id) else {
            debug!(command_id, "ignoring failure of unknown command");
            return;
        };
        let intent = entry.command.intent;
        entry.command.status = CommandStatus::Failed;
        entry.command.error = Some(error.to_occurrence(error_id, failed_at));
        entry.command.completed_at = Some(failed_at);

        self.state.dequeue(command_id);
        if self.state.running_command_id.as_deref() == Some(command_id) {
            self.state.running_command_id = None;
        }

        let cascaded = match intent {
            CommandIntent::Setup => self.state.queued_setup_command_ids.drain(),
            CommandIntent::Protocol => self.state.queued_command_ids.drain(),
        };
        for id in &cascaded {
            if let Some(entry) = self.state.commands_by_id.get_mut(id) {
                entry.command.status = CommandStatus::Failed;
                entry.command.error = None;
                entry.command.completed_at = Some(failed_at);
            }
        }

        debug!(
            command_id,
            error_id,
            cascaded = cascaded.len(),
            "command failed"
        );
    }

    fn play(&mut self, requested_at: DateTime<Utc>) {
        if self.state.run_result.is_some() {
            debug!("ignoring play after run result was set");
            return;
        }
        self.state.run_started_at.get_or_insert(requested_at);
        // Play always leaves SETUP, so only the door and the config matter.
        self.state.is_door_blocking = self.config.block_on_door_open && self.state.is_door_open;
        self.state.queue_status = if self.state.is_door_blocking {
            QueueStatus::Paused
        } else {
            QueueStatus::Running
        };
        debug!(queue_status = ?self.state.queue_status, "run played");
    }

    fn end_run(&mut self, result: RunResult, error_details: Option<&FinishErrorDetails>) {
        if self.state.run_result.is_some() {
            return;
        }
        self.state.queue_status = QueueStatus::Paused;
        self.state.queued_command_ids.clear();
        self.state.queued_setup_command_ids.clear();
        self.state.run_result = Some(result);

        if let Some(details) = error_details {
            let occurrence = details
                .error
                .to_occurrence(details.error_id.clone(), details.created_at);
            self.state
                .errors_by_id
                .insert(details.error_id.clone(), occurrence);
        }

        debug!(run_result = ?result, "run ended");
    }

    fn door_change(&mut self, door_state: DoorState) {
        self.state.is_door_open = door_state.is_open();
        self.state.is_door_blocking = self.config.block_on_door_open
            && self.state.is_door_open
            && self.state.queue_status != QueueStatus::Setup;

        if self.state.is_door_blocking && self.state.queue_status == QueueStatus::Running {
            self.state.queue_status = QueueStatus::Paused;
        }
    }
}
