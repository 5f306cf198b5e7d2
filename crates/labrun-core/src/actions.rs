//! The closed set of actions that change run state
//!
//! Every state change in a run is expressed as one of these values and
//! applied by [`CommandStore::handle_action`](crate::state::CommandStore::handle_action).
//! Actions carry every id and timestamp the reducer needs, so reducing the
//! same sequence of actions always produces the same state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Command, CommandCreate, ErrorInfo};

/// Who asked for a pause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseSource {
    Client,
    Protocol,
}

/// Robot door position as reported by the door sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Open,
    Closed,
}

impl DoorState {
    pub fn is_open(&self) -> bool {
        matches!(self, DoorState::Open)
    }
}

/// The error that ended a run, with the id and time to record it under
#[derive(Debug, Clone, PartialEq)]
pub struct FinishErrorDetails {
    pub error_id: String,
    pub created_at: DateTime<Utc>,
    pub error: ErrorInfo,
}

/// A state-changing event
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Add a new QUEUED command built from `request`
    QueueCommand {
        request: CommandCreate,
        command_id: String,
        created_at: DateTime<Utc>,
    },

    /// Insert or replace a command by id
    UpdateCommand { command: Command },

    /// Mark a command FAILED and fail the rest of its queue
    FailCommand {
        command_id: String,
        error_id: String,
        error: ErrorInfo,
        failed_at: DateTime<Utc>,
    },

    /// Start or resume the protocol queue
    Play { requested_at: DateTime<Utc> },

    Pause { source: PauseSource },

    /// Stop the run with a STOPPED result
    Stop,

    /// End the run, optionally because of an error
    ///
    /// With `set_run_status = false` the result is STOPPED regardless of
    /// `error_details`.
    Finish {
        error_details: Option<FinishErrorDetails>,
        set_run_status: bool,
    },

    /// Hardware has come to rest after the run ended
    HardwareStopped { completed_at: DateTime<Utc> },

    DoorChange { door_state: DoorState },
}

impl Action {
    /// Short action name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::QueueCommand { .. } => "queue_command",
            Action::UpdateCommand { .. } => "update_command",
            Action::FailCommand { .. } => "fail_command",
            Action::Play { .. } => "play",
            Action::Pause { .. } => "pause",
            Action::Stop => "stop",
            Action::Finish { .. } => "finish",
            Action::HardwareStopped { .. } => "hardware_stopped",
            Action::DoorChange { .. } => "door_change",
        }
    }

    /// A successful Finish
    pub fn finish() -> Self {
        Action::Finish {
            error_details: None,
            set_run_status: true,
        }
    }
}
