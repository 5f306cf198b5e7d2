//! Hardware controller capability
//!
//! The engine only needs four motions from the robot: pause, resume, halt,
//! and a full stop-and-recover. Implementations report failures with
//! `anyhow`; [`HardwareApi`] converts them into
//! [`ProtocolEngineError::Hardware`] and serializes calls.

use std::sync::Arc;

use async_trait::async_trait;
use labrun_core::{ProtocolEngineError, Result};
use tokio::sync::Mutex;

/// Why the hardware is being paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseType {
    /// Wait for a resume
    Pause,
    /// Timed delay issued by a command
    Delay,
}

#[async_trait]
pub trait HardwareControl: Send + Sync {
    async fn pause(&self, pause_type: PauseType) -> anyhow::Result<()>;

    async fn resume(&self) -> anyhow::Result<()>;

    /// Stop all motion immediately
    async fn halt(&self) -> anyhow::Result<()>;

    /// Bring the robot to rest after a run, optionally dropping tips and homing
    async fn stop_and_recover(&self, drop_tips_and_home: bool) -> anyhow::Result<()>;
}

/// Serialized access to a [`HardwareControl`]
#[derive(Clone)]
pub struct HardwareApi {
    inner: Arc<dyn HardwareControl>,
    lock: Arc<Mutex<()>>,
}

impl HardwareApi {
    pub fn new(inner: Arc<dyn HardwareControl>) -> Self {
        Self {
            inner,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// # Errors
    ///
    /// `Hardware` if the controller fails.
    pub async fn pause(&self, pause_type: PauseType) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.inner.pause(pause_type).await.map_err(hardware_error)
    }

    /// # Errors
    ///
    /// `Hardware` if the controller fails.
    pub async fn resume(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.inner.resume().await.map_err(hardware_error)
    }

    /// # Errors
    ///
    /// `Hardware` if the controller fails.
    pub async fn halt(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.inner.halt().await.map_err(hardware_error)
    }

    /// # Errors
    ///
    /// `Hardware` if the controller fails.
    pub async fn stop_and_recover(&self, drop_tips_and_home: bool) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.inner
            .stop_and_recover(drop_tips_and_home)
            .await
            .map_err(hardware_error)
    }
}

impl std::fmt::Debug for HardwareApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareApi").finish_non_exhaustive()
    }
}

fn hardware_error(err: anyhow::Error) -> ProtocolEngineError {
    ProtocolEngineError::Hardware {
        message: format!("{:#}", err),
    }
}
