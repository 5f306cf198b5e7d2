//! Command executor capability
//!
//! Executes one command against the hardware and returns its opaque result.
//! An executor that fails with an [`ErrorInfo`] (directly or anywhere in the
//! `anyhow` chain) keeps its error type; any other failure is recorded as
//! an unexpected protocol error.

use async_trait::async_trait;
use labrun_core::{Command, ErrorInfo};
use serde_json::Value;

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &Command) -> anyhow::Result<Option<Value>>;
}

/// Turn an executor failure into the error recorded on the command
pub fn to_error_info(err: &anyhow::Error) -> ErrorInfo {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ErrorInfo>())
        .cloned()
        .unwrap_or_else(|| ErrorInfo::unexpected(format!("{:#}", err)))
}
