use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error_occurrence::ErrorOccurrence;
use super::params::CommandParams;

/// Lifecycle status of a command
///
/// Only moves forward: QUEUED → RUNNING → SUCCEEDED | FAILED. A queued
/// command may also go straight to FAILED when its queue is failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl CommandStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandStatus::Succeeded | CommandStatus::Failed)
    }
}

/// Which queue a command belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandIntent {
    #[default]
    Protocol,
    Setup,
}

/// A request to add a command to the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandCreate {
    #[serde(flatten)]
    pub params: CommandParams,
    #[serde(default)]
    pub intent: Option<CommandIntent>,
    #[serde(default)]
    pub key: Option<String>,
}

impl CommandCreate {
    pub fn new(params: CommandParams) -> Self {
        Self {
            params,
            intent: None,
            key: None,
        }
    }

    pub fn with_intent(mut self, intent: CommandIntent) -> Self {
        self.intent = Some(intent);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// A unit of work in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,
    /// Client-visible key; defaults to `id`
    pub key: String,
    pub status: CommandStatus,
    pub intent: CommandIntent,
    #[serde(flatten)]
    pub params: CommandParams,
    /// Executor output, set on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Present only on the command whose own execution failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOccurrence>,
}

impl Command {
    /// Build a freshly queued command from a request
    pub fn queued(request: &CommandCreate, id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let id = id.into();
        Self {
            key: request.key.clone().unwrap_or_else(|| id.clone()),
            id,
            status: CommandStatus::Queued,
            intent: request.intent.unwrap_or_default(),
            params: request.params.clone(),
            result: None,
            created_at,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn command_type(&self) -> &'static str {
        self.params.command_type()
    }

    /// Copy of this command marked RUNNING at `started_at`
    pub fn started(&self, started_at: DateTime<Utc>) -> Self {
        Self {
            status: CommandStatus::Running,
            started_at: Some(started_at),
            ..self.clone()
        }
    }

    /// Copy of this command marked SUCCEEDED at `completed_at`
    pub fn succeeded(
        &self,
        completed_at: DateTime<Utc>,
        result: Option<serde_json::Value>,
    ) -> Self {
        Self {
            status: CommandStatus::Succeeded,
            completed_at: Some(completed_at),
            result,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::params::HomeParams;

    fn home_request() -> CommandCreate {
        CommandCreate::new(CommandParams::Home(HomeParams::default()))
    }

    #[test]
    fn test_queued_key_defaults_to_id() {
        let cmd = Command::queued(&home_request(), "c1", Utc::now());
        assert_eq!(cmd.key, "c1");
        assert_eq!(cmd.status, CommandStatus::Queued);
        assert_eq!(cmd.intent, CommandIntent::Protocol);
    }

    #[test]
    fn test_queued_keeps_explicit_key_and_intent() {
        let request = home_request()
            .with_key("home-first")
            .with_intent(CommandIntent::Setup);
        let cmd = Command::queued(&request, "c1", Utc::now());
        assert_eq!(cmd.key, "home-first");
        assert_eq!(cmd.intent, CommandIntent::Setup);
    }

    #[test]
    fn test_lifecycle_copies_move_forward() {
        let t0 = Utc::now();
        let queued = Command::queued(&home_request(), "c1", t0);
        let running = queued.started(t0);
        let done = running.succeeded(t0, Some(serde_json::json!({"ok": true})));

        assert_eq!(running.status, CommandStatus::Running);
        assert_eq!(done.status, CommandStatus::Succeeded);
        assert_eq!(done.started_at, Some(t0));
        assert!(done.status.is_terminal());
        assert!(done.result.is_some());
    }
}
