//! Run configuration
//!
//! Handed to the store when a run is created and never changed afterwards.

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Per-run engine configuration
///
/// # Example
///
/// ```
/// use labrun_core::config::Config;
///
/// let config = Config::from_toml_str("block_on_door_open = true").unwrap();
/// assert!(config.block_on_door_open);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pause the protocol queue while the robot door is open
    pub block_on_door_open: bool,
}

impl Config {
    /// Parse configuration from TOML; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns `ProtocolEngineError::Config` if the text is not valid TOML or
    /// a key has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
