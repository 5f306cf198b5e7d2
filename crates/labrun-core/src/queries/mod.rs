//! Read-only queries over run state
//!
//! Queries never mutate state and return deterministically ordered results.
//! The view also hosts the single validation gate for control actions.

pub mod command_view;

pub use command_view::{CommandSlice, CommandView, CurrentCommand, EngineStatus};
