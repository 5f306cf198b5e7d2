pub mod command;
pub mod error_occurrence;
pub mod params;

pub use command::{Command, CommandCreate, CommandIntent, CommandStatus};
pub use error_occurrence::{ErrorInfo, ErrorOccurrence, UNEXPECTED_ERROR_TYPE};
pub use params::CommandParams;
