//! Id and timestamp sources
//!
//! Reducers never read the wall clock or generate ids themselves. Every
//! timestamp and id that ends up in run state is produced here and carried
//! into the state kernel inside an action, which keeps the kernel
//! deterministic and testable.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of unique ids and timestamps for the engine
pub trait ModelUtils: Send + Sync {
    /// Generate a new unique identifier
    fn generate_id(&self) -> String;

    /// Get the current time
    fn get_timestamp(&self) -> DateTime<Utc>;
}

/// Production id/clock source: UUIDv7 ids and the system UTC clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemModelUtils;

impl ModelUtils for SystemModelUtils {
    fn generate_id(&self) -> String {
        Uuid::now_v7().to_string()
    }

    fn get_timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
