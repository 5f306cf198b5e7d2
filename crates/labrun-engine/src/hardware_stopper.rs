//! Bringing hardware to rest when a run ends

use labrun_core::Result;
use tracing::{debug, error};

use crate::hardware::HardwareApi;

#[derive(Debug, Clone)]
pub struct HardwareStopper {
    hardware: HardwareApi,
}

impl HardwareStopper {
    pub fn new(hardware: HardwareApi) -> Self {
        Self { hardware }
    }

    /// Stop all motion now
    ///
    /// # Errors
    ///
    /// `Hardware` if the halt fails. The failure is logged here.
    pub async fn do_halt(&self) -> Result<()> {
        debug!("halting hardware");
        self.hardware.halt().await.inspect_err(|e| {
            error!(error = %e, "hardware halt failed");
        })
    }

    /// Recover the robot to a safe idle position
    ///
    /// # Errors
    ///
    /// `Hardware` if recovery fails. The failure is logged here.
    pub async fn do_stop_and_recover(&self, drop_tips_and_home: bool) -> Result<()> {
        debug!(drop_tips_and_home, "stopping and recovering hardware");
        self.hardware
            .stop_and_recover(drop_tips_and_home)
            .await
            .inspect_err(|e| {
                error!(error = %e, drop_tips_and_home, "hardware recovery failed");
            })
    }
}
