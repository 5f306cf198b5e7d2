//! Labrun Core - deterministic run-state kernel
//!
//! This crate holds everything about a protocol run that does not need a
//! runtime:
//! - Command and error models, including the closed set of command types
//! - The closed [`Action`] set and the reducer that applies it
//!   ([`CommandStore::handle_action`])
//! - The read-only [`CommandView`] and its action validation gate
//! - Run configuration, the error facility, and the logging facility
//!
//! Orchestration (queue worker, hardware, door sensor) lives in
//! `labrun-engine`.

pub mod actions;
pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod queries;
pub mod state;

/// Re-exported for the logging macros
pub use labrun_core_types as core_types;

pub use actions::{Action, DoorState, FinishErrorDetails, PauseSource};
pub use config::Config;
pub use errors::{ExError, ExErrorKind, ProtocolEngineError, Result};
pub use model::{
    Command, CommandCreate, CommandIntent, CommandParams, CommandStatus, ErrorInfo,
    ErrorOccurrence,
};
pub use queries::{CommandSlice, CommandView, CurrentCommand, EngineStatus};
pub use state::{CommandEntry, CommandState, CommandStore, QueueStatus, RunResult};
