use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type recorded when an executor failure carries no classification
pub const UNEXPECTED_ERROR_TYPE: &str = "UnexpectedProtocolError";

/// An immutable record of an error that happened during a run
///
/// Attached to a FAILED command, or stored as a run-level error when a run
/// is finished with an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOccurrence {
    pub id: String,
    pub error_type: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

/// A classified error before it is recorded
///
/// Command executors return this (wrapped in `anyhow`) to control the
/// `error_type` that ends up in the occurrence.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{error_type}: {detail}")]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub error_type: String,
    pub detail: String,
}

impl ErrorInfo {
    pub fn new(error_type: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            detail: detail.into(),
        }
    }

    /// An unclassified error
    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::new(UNEXPECTED_ERROR_TYPE, detail)
    }

    /// Stamp this error with an id and time
    pub fn to_occurrence(&self, id: impl Into<String>, created_at: DateTime<Utc>) -> ErrorOccurrence {
        ErrorOccurrence {
            id: id.into(),
            error_type: self.error_type.clone(),
            detail: self.detail.clone(),
            created_at,
        }
    }
}
