//! Core types shared across labrun crates
//!
//! This crate provides foundational types used by the state kernel,
//! the engine and the logging facility:
//!
//! - **Resources**: `ModelUtils` id/timestamp source injected into the engine
//! - **Schema constants**: Canonical field keys and event names

pub mod resources;
pub mod schema;

pub use resources::{ModelUtils, SystemModelUtils};
