use chrono::{DateTime, TimeZone, Utc};
use labrun_core::model::params::{HomeParams, WaitForResumeParams};
use labrun_core::{
    Action, Command, CommandCreate, CommandEntry, CommandIntent, CommandParams, CommandState,
    CommandStatus, CommandStore, Config, DoorState, ErrorInfo, ErrorOccurrence,
};

/// Fixed timestamp `secs` seconds after 2021-01-01T00:00:00Z
#[allow(dead_code)]
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

#[allow(dead_code)]
pub fn home_request(intent: CommandIntent) -> CommandCreate {
    CommandCreate::new(CommandParams::Home(HomeParams::default())).with_intent(intent)
}

#[allow(dead_code)]
pub fn wait_request() -> CommandCreate {
    CommandCreate::new(CommandParams::WaitForResume(WaitForResumeParams::default()))
}

#[allow(dead_code)]
pub fn new_store() -> CommandStore {
    CommandStore::new(Config::default(), DoorState::Closed)
}

#[allow(dead_code)]
pub fn door_blocking_store() -> CommandStore {
    CommandStore::new(
        Config {
            block_on_door_open: true,
        },
        DoorState::Closed,
    )
}

#[allow(dead_code)]
pub fn queue_action(id: &str, intent: CommandIntent) -> Action {
    Action::QueueCommand {
        request: home_request(intent),
        command_id: id.to_string(),
        created_at: at(0),
    }
}

#[allow(dead_code)]
pub fn fail_action(id: &str, failed_at: DateTime<Utc>) -> Action {
    Action::FailCommand {
        command_id: id.to_string(),
        error_id: format!("error-{}", id),
        error: ErrorInfo::new("PrettyBadError", "Oh no"),
        failed_at,
    }
}

/// Build a command directly in the given status
#[allow(dead_code)]
pub fn command(id: &str, status: CommandStatus, intent: CommandIntent) -> Command {
    let mut command = Command::queued(&home_request(intent), id, at(0));
    command.status = status;
    if status != CommandStatus::Queued {
        command.started_at = Some(at(1));
    }
    if status.is_terminal() {
        command.completed_at = Some(at(2));
    }
    if status == CommandStatus::Failed {
        command.error = Some(ErrorOccurrence {
            id: format!("error-{}", id),
            error_type: "PrettyBadError".to_string(),
            detail: "Oh no".to_string(),
            created_at: at(2),
        });
    }
    command
}

#[allow(dead_code)]
pub fn protocol(id: &str, status: CommandStatus) -> Command {
    command(id, status, CommandIntent::Protocol)
}

/// A state holding `commands` in order, with nothing queued or running
#[allow(dead_code)]
pub fn state_with(commands: Vec<Command>) -> CommandState {
    let mut state = CommandState::default();
    for (index, command) in commands.into_iter().enumerate() {
        state.all_command_ids.push(command.id.clone());
        state
            .commands_by_id
            .insert(command.id.clone(), CommandEntry { index, command });
    }
    state
}
