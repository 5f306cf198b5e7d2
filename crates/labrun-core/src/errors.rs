use thiserror::Error;

/// Result type alias using ProtocolEngineError
pub type Result<T> = std::result::Result<T, ProtocolEngineError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Stable classification of every error the run core can report. Each kind
/// maps to an error code that callers (and log assertions) can match on
/// without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Run control
    RunStopped,
    PauseNotAllowed,
    SetupCommandNotAllowed,
    RobotDoorOpen,

    // Lookup
    NotFound,

    // Execution
    ProtocolCommandFailed,
    Hardware,
    Concurrency,

    // Configuration
    InvalidInput,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::RunStopped => "ERR_RUN_STOPPED",
            ExErrorKind::PauseNotAllowed => "ERR_PAUSE_NOT_ALLOWED",
            ExErrorKind::SetupCommandNotAllowed => "ERR_SETUP_COMMAND_NOT_ALLOWED",
            ExErrorKind::RobotDoorOpen => "ERR_ROBOT_DOOR_OPEN",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::ProtocolCommandFailed => "ERR_PROTOCOL_COMMAND_FAILED",
            ExErrorKind::Hardware => "ERR_HARDWARE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus optional context for logging and
/// programmatic handling at the engine boundary.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    command_id: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            command_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add command ID context
    pub fn with_command_id(mut self, id: impl Into<String>) -> Self {
        self.command_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn command_id(&self) -> Option<&str> {
        self.command_id.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(command_id) = &self.command_id {
            write!(f, " (command_id: {})", command_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Errors raised by run control, queries, and engine orchestration
///
/// Validation variants are raised before any action is dispatched, so
/// returning one never changes run state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolEngineError {
    /// The run already has a result; no further control actions are accepted
    #[error("The run has already stopped")]
    RunStopped,

    /// Pause was requested while the queue is not running
    #[error("Cannot pause a run that is not running")]
    PauseNotAllowed,

    /// A setup command was submitted after the run left setup
    #[error("Setup commands are not allowed after the run has started")]
    SetupCommandNotAllowed,

    /// Play was requested while an open door blocks the run
    #[error("Front door or top window is currently open")]
    RobotDoorOpen,

    #[error("Command not found: {command_id}")]
    CommandDoesNotExist { command_id: String },

    /// A protocol command failed, which makes the whole run fail
    #[error("Protocol command {command_id} failed: {detail}")]
    ProtocolCommandFailed { command_id: String, detail: String },

    /// The hardware controller reported an error
    #[error("Hardware error: {message}")]
    Hardware { message: String },

    /// The background queue worker crashed or was cancelled unexpectedly
    #[error("Queue worker failed: {message}")]
    QueueWorkerFailed { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ProtocolEngineError {
    /// Shorthand for a missing-command lookup error
    pub fn not_found(command_id: impl Into<String>) -> Self {
        ProtocolEngineError::CommandDoesNotExist {
            command_id: command_id.into(),
        }
    }
}

/// Conversion from ProtocolEngineError to ExError
impl From<ProtocolEngineError> for ExError {
    fn from(err: ProtocolEngineError) -> Self {
        match err {
            ProtocolEngineError::RunStopped => {
                ExError::new(ExErrorKind::RunStopped).with_message("Run has already stopped")
            }
            ProtocolEngineError::PauseNotAllowed => ExError::new(ExErrorKind::PauseNotAllowed)
                .with_message("Run is not running"),
            ProtocolEngineError::SetupCommandNotAllowed => {
                ExError::new(ExErrorKind::SetupCommandNotAllowed)
                    .with_message("Run has left setup")
            }
            ProtocolEngineError::RobotDoorOpen => {
                ExError::new(ExErrorKind::RobotDoorOpen).with_message("Door is open")
            }
            ProtocolEngineError::CommandDoesNotExist { command_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_command_id(command_id)
                    .with_message("Command not found")
            }
            ProtocolEngineError::ProtocolCommandFailed { command_id, detail } => {
                ExError::new(ExErrorKind::ProtocolCommandFailed)
                    .with_command_id(command_id)
                    .with_message(detail)
            }
            ProtocolEngineError::Hardware { message } => {
                ExError::new(ExErrorKind::Hardware).with_message(message)
            }
            ProtocolEngineError::QueueWorkerFailed { message } => {
                ExError::new(ExErrorKind::Concurrency)
                    .with_op("queue_worker")
                    .with_message(message)
            }
            ProtocolEngineError::Config { message } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            ProtocolEngineError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<toml::de::Error> for ProtocolEngineError {
    fn from(err: toml::de::Error) -> Self {
        ProtocolEngineError::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_control_error_kind_codes() {
        let cases = [
            (ExErrorKind::RunStopped, "ERR_RUN_STOPPED"),
            (ExErrorKind::PauseNotAllowed, "ERR_PAUSE_NOT_ALLOWED"),
            (
                ExErrorKind::SetupCommandNotAllowed,
                "ERR_SETUP_COMMAND_NOT_ALLOWED",
            ),
            (ExErrorKind::RobotDoorOpen, "ERR_ROBOT_DOOR_OPEN"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_not_found_carries_command_id() {
        let ex: ExError = ProtocolEngineError::not_found("cmd-9").into();
        assert_eq!(ex.kind(), ExErrorKind::NotFound);
        assert_eq!(ex.command_id(), Some("cmd-9"));
    }

    #[test]
    fn test_display_includes_code_op_and_message() {
        let err = ExError::new(ExErrorKind::Hardware)
            .with_op("stop")
            .with_message("halt timed out");
        let rendered = err.to_string();
        assert!(rendered.contains("ERR_HARDWARE"));
        assert!(rendered.contains("'stop'"));
        assert!(rendered.contains("halt timed out"));
    }

    #[test]
    fn test_toml_error_becomes_config_error() {
        let parse_err = toml::from_str::<toml::Value>("=").unwrap_err();
        let err: ProtocolEngineError = parse_err.into();
        assert!(matches!(err, ProtocolEngineError::Config { .. }));
    }
}
