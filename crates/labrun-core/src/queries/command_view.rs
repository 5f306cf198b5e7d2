//! Command and run status queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::errors::{ProtocolEngineError, Result};
use crate::model::{Command, CommandIntent, CommandStatus, ErrorOccurrence};
use crate::state::{CommandState, QueueStatus, RunResult};

/// Overall status of a run, derived from the command state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineStatus {
    Idle,
    Running,
    Paused,
    BlockedByOpenDoor,
    StopRequested,
    Stopped,
    Finishing,
    Failed,
    Succeeded,
}

/// The command a client should consider "current"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentCommand {
    pub index: usize,
    pub command_id: String,
    pub command_key: String,
    pub created_at: DateTime<Utc>,
}

/// A window of the run's command history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSlice {
    pub commands: Vec<Command>,
    /// Index of the first command in `commands`
    pub cursor: usize,
    pub total_length: usize,
}

/// Read-only view of a [`CommandState`]
#[derive(Debug, Clone, Copy)]
pub struct CommandView<'a> {
    state: &'a CommandState,
}

impl<'a> CommandView<'a> {
    pub fn new(state: &'a CommandState) -> Self {
        Self { state }
    }

    /// Get a command by id
    ///
    /// # Errors
    ///
    /// Returns `CommandDoesNotExist` if no command has that id.
    pub fn get(&self, command_id: &str) -> Result<&'a Command> {
        self.state
            .commands_by_id
            .get(command_id)
            .map(|entry| &entry.command)
            .ok_or_else(|| ProtocolEngineError::not_found(command_id))
    }

    /// All commands in the order they were first seen
    pub fn get_all(&self) -> Vec<&'a Command> {
        self.state
            .all_command_ids
            .iter()
            .filter_map(|id| self.state.commands_by_id.get(id))
            .map(|entry| &entry.command)
            .collect()
    }

    /// Id of the command the queue worker should run next
    ///
    /// Nothing is handed out unless the queue is RUNNING. Setup commands
    /// always go ahead of protocol commands.
    ///
    /// # Errors
    ///
    /// Returns `RunStopped` once the run has a result, which tells the queue
    /// worker to exit.
    pub fn get_next_queued(&self) -> Result<Option<&'a str>> {
        if self.state.run_result.is_some() {
            return Err(ProtocolEngineError::RunStopped);
        }
        if self.state.queue_status != QueueStatus::Running {
            return Ok(None);
        }
        let next = self
            .state
            .queued_setup_command_ids
            .head()
            .or_else(|| self.state.queued_command_ids.head());
        Ok(next.map(String::as_str))
    }

    pub fn get_is_running(&self) -> bool {
        self.state.queue_status == QueueStatus::Running
    }

    /// Whether a command has reached SUCCEEDED or FAILED
    ///
    /// # Errors
    ///
    /// Returns `CommandDoesNotExist` for an unknown id.
    pub fn get_is_complete(&self, command_id: &str) -> Result<bool> {
        Ok(self.get(command_id)?.status.is_terminal())
    }

    /// Whether both queues have drained with nothing running
    ///
    /// # Errors
    ///
    /// Returns `ProtocolCommandFailed` if any protocol command has failed.
    /// Failed setup commands are not fatal.
    pub fn get_all_complete(&self) -> Result<bool> {
        let failed = self.get_all().into_iter().find(|command| {
            command.intent == CommandIntent::Protocol && command.status == CommandStatus::Failed
        });
        if let Some(command) = failed {
            let detail = command
                .error
                .as_ref()
                .map(|error| error.detail.clone())
                .unwrap_or_else(|| format!("command {} failed", command.id));
            return Err(ProtocolEngineError::ProtocolCommandFailed {
                command_id: command.id.clone(),
                detail,
            });
        }

        Ok(self.state.running_command_id.is_none()
            && self.state.queued_command_ids.is_empty()
            && self.state.queued_setup_command_ids.is_empty())
    }

    /// Whether the run has a result (stop or finish was requested)
    pub fn get_stop_requested(&self) -> bool {
        self.state.run_result.is_some()
    }

    /// Whether the hardware has come to rest after the run ended
    pub fn get_is_stopped(&self) -> bool {
        self.state.run_completed_at.is_some()
    }

    pub fn has_been_played(&self) -> bool {
        self.state.run_started_at.is_some()
    }

    pub fn get_is_door_blocking(&self) -> bool {
        self.state.is_door_blocking
    }

    pub fn get_queue_status(&self) -> QueueStatus {
        self.state.queue_status
    }

    pub fn get_run_result(&self) -> Option<RunResult> {
        self.state.run_result
    }

    pub fn get_running(&self) -> Option<&'a str> {
        self.state.running_command_id.as_deref()
    }

    /// Run-level errors, oldest first
    pub fn get_all_errors(&self) -> Vec<&'a ErrorOccurrence> {
        let mut errors: Vec<&ErrorOccurrence> = self.state.errors_by_id.values().collect();
        errors.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        errors
    }

    /// Check that an action is legal in the current state
    ///
    /// This is the only gate in front of the reducer. It never changes
    /// state; an allowed action is handed back unchanged.
    ///
    /// # Errors
    ///
    /// - `RunStopped` for Play, Pause, Stop or QueueCommand once the run has
    ///   a result
    /// - `RobotDoorOpen` for Play while an open door blocks the run
    /// - `PauseNotAllowed` for Pause unless the queue is RUNNING
    /// - `SetupCommandNotAllowed` for a setup command outside SETUP
    pub fn validate_action_allowed(&self, action: Action) -> Result<Action> {
        let stopped = self.state.run_result.is_some();

        match &action {
            Action::Play { .. } => {
                if stopped {
                    return Err(ProtocolEngineError::RunStopped);
                }
                if self.state.is_door_blocking && self.state.queue_status != QueueStatus::Setup {
                    return Err(ProtocolEngineError::RobotDoorOpen);
                }
            }
            Action::Pause { .. } => {
                if stopped {
                    return Err(ProtocolEngineError::RunStopped);
                }
                if self.state.queue_status != QueueStatus::Running {
                    return Err(ProtocolEngineError::PauseNotAllowed);
                }
            }
            Action::Stop => {
                if stopped {
                    return Err(ProtocolEngineError::RunStopped);
                }
            }
            Action::QueueCommand { request, .. } => {
                if stopped {
                    return Err(ProtocolEngineError::RunStopped);
                }
                if request.intent == Some(CommandIntent::Setup)
                    && self.state.queue_status != QueueStatus::Setup
                {
                    return Err(ProtocolEngineError::SetupCommandNotAllowed);
                }
            }
            _ => {}
        }

        Ok(action)
    }

    /// Derive the overall run status
    ///
    /// Precedence: a finished run reports its result, a run with a result
    /// that is still winding down reports FINISHING or STOP_REQUESTED, then
    /// the queue status decides (an open door turns PAUSED into
    /// BLOCKED_BY_OPEN_DOOR).
    pub fn get_status(&self) -> EngineStatus {
        if let Some(result) = self.state.run_result {
            return match (result, self.state.run_completed_at.is_some()) {
                (RunResult::Succeeded, true) => EngineStatus::Succeeded,
                (RunResult::Failed, true) => EngineStatus::Failed,
                (RunResult::Stopped, true) => EngineStatus::Stopped,
                (RunResult::Stopped, false) => EngineStatus::StopRequested,
                (_, false) => EngineStatus::Finishing,
            };
        }

        match self.state.queue_status {
            QueueStatus::Running => EngineStatus::Running,
            QueueStatus::Paused if self.state.is_door_blocking => EngineStatus::BlockedByOpenDoor,
            QueueStatus::Paused => EngineStatus::Paused,
            QueueStatus::Setup => EngineStatus::Idle,
        }
    }

    /// Whether the run can be discarded without interrupting anything
    pub fn get_is_okay_to_clear(&self) -> bool {
        if self.get_is_stopped() {
            return true;
        }
        self.get_status() == EngineStatus::Idle
            && self.state.running_command_id.is_none()
            && self.state.queued_setup_command_ids.is_empty()
    }

    /// The running command, or else the most recent command that has left
    /// the queue
    pub fn get_current(&self) -> Option<CurrentCommand> {
        let entry = match &self.state.running_command_id {
            Some(id) => self.state.commands_by_id.get(id),
            None => self
                .state
                .all_command_ids
                .iter()
                .rev()
                .filter_map(|id| self.state.commands_by_id.get(id))
                .find(|entry| entry.command.status != CommandStatus::Queued),
        }?;

        Some(CurrentCommand {
            index: entry.index,
            command_id: entry.command.id.clone(),
            command_key: entry.command.key.clone(),
            created_at: entry.command.created_at,
        })
    }

    /// A window of at most `length` commands starting at `cursor`
    ///
    /// Out-of-range cursors are clamped into the history. Without a cursor
    /// the window starts at [`CommandView::get_current`], or covers the tail
    /// when nothing has left the queue yet.
    pub fn get_slice(&self, cursor: Option<i64>, length: usize) -> CommandSlice {
        let all = &self.state.all_command_ids;
        let total_length = all.len();

        let cursor = cursor.unwrap_or_else(|| match self.get_current() {
            Some(current) => current.index as i64,
            None => total_length as i64 - length as i64,
        });

        let last = total_length.saturating_sub(1) as i64;
        let start = cursor.clamp(0, last) as usize;
        let stop = total_length.min(start.saturating_add(length));

        let commands = all[start..stop]
            .iter()
            .filter_map(|id| self.state.commands_by_id.get(id))
            .map(|entry| entry.command.clone())
            .collect();

        CommandSlice {
            commands,
            cursor: start,
            total_length,
        }
    }
}
