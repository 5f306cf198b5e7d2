//! Authoritative run state and the reducer that changes it

pub mod ordered_set;
pub mod store;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Command, ErrorOccurrence};

pub use ordered_set::OrderedSet;
pub use store::CommandStore;

/// State of the command queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Only setup commands run; the protocol has not been played
    Setup,
    Running,
    Paused,
}

/// How a run ended; once set it never changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunResult {
    Succeeded,
    Failed,
    Stopped,
}

/// A command plus its stable position in the run history
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEntry {
    pub index: usize,
    pub command: Command,
}

/// Everything known about one run
///
/// Fields are public so tests and tools can build arbitrary states for the
/// view. Inside the engine the state is only changed by
/// [`CommandStore::handle_action`].
#[derive(Debug, Clone, PartialEq)]
pub struct CommandState {
    pub queue_status: QueueStatus,
    pub run_result: Option<RunResult>,
    pub running_command_id: Option<String>,
    pub queued_command_ids: OrderedSet<String>,
    pub queued_setup_command_ids: OrderedSet<String>,
    /// Every command id in order of first appearance
    pub all_command_ids: Vec<String>,
    pub commands_by_id: HashMap<String, CommandEntry>,
    /// Run-level errors, recorded when a run finishes with an error
    pub errors_by_id: HashMap<String, ErrorOccurrence>,
    pub run_started_at: Option<DateTime<Utc>>,
    pub run_completed_at: Option<DateTime<Utc>>,
    pub is_door_open: bool,
    pub is_door_blocking: bool,
}

impl CommandState {
    /// State of a run that has not been played yet
    pub fn new(is_door_open: bool) -> Self {
        Self {
            queue_status: QueueStatus::Setup,
            run_result: None,
            running_command_id: None,
            queued_command_ids: OrderedSet::new(),
            queued_setup_command_ids: OrderedSet::new(),
            all_command_ids: Vec::new(),
            commands_by_id: HashMap::new(),
            errors_by_id: HashMap::new(),
            run_started_at: None,
            run_completed_at: None,
            is_door_open,
            is_door_blocking: false,
        }
    }

    /// Insert a command at a fresh index, or replace it at its existing one
    pub fn upsert_command(&mut self, command: Command) {
        match self.commands_by_id.get_mut(&command.id) {
            Some(entry) => entry.command = command,
            None => {
                let index = self.all_command_ids.len();
                self.all_command_ids.push(command.id.clone());
                self.commands_by_id
                    .insert(command.id.clone(), CommandEntry { index, command });
            }
        }
    }

    /// Remove an id from whichever queue holds it
    pub(crate) fn dequeue(&mut self, command_id: &str) {
        let id = command_id.to_string();
        self.queued_command_ids.remove(&id);
        self.queued_setup_command_ids.remove(&id);
    }
}

impl Default for CommandState {
    fn default() -> Self {
        Self::new(false)
    }
}
