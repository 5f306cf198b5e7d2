//! Per-type command parameters
//!
//! The run core never interprets these; they are carried from the request to
//! the command executor untouched. The set is closed so that an unknown
//! command type is rejected at deserialization rather than at execution.

use serde::{Deserialize, Serialize};

/// Parameters of a command, tagged by command type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "commandType", content = "params", rename_all = "camelCase")]
pub enum CommandParams {
    Aspirate(LiquidParams),
    Dispense(LiquidParams),
    PickUpTip(WellLocation),
    DropTip(WellLocation),
    MoveToWell(WellLocation),
    LoadLabware(LoadLabwareParams),
    LoadPipette(LoadPipetteParams),
    LoadModule(LoadModuleParams),
    Home(HomeParams),
    #[serde(alias = "pause")]
    WaitForResume(WaitForResumeParams),
    Delay(DelayParams),
}

impl CommandParams {
    /// Wire name of the command type
    pub fn command_type(&self) -> &'static str {
        match self {
            CommandParams::Aspirate(_) => "aspirate",
            CommandParams::Dispense(_) => "dispense",
            CommandParams::PickUpTip(_) => "pickUpTip",
            CommandParams::DropTip(_) => "dropTip",
            CommandParams::MoveToWell(_) => "moveToWell",
            CommandParams::LoadLabware(_) => "loadLabware",
            CommandParams::LoadPipette(_) => "loadPipette",
            CommandParams::LoadModule(_) => "loadModule",
            CommandParams::Home(_) => "home",
            CommandParams::WaitForResume(_) => "waitForResume",
            CommandParams::Delay(_) => "delay",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellLocation {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidParams {
    #[serde(flatten)]
    pub location: WellLocation,
    /// Microliters
    pub volume: f64,
    /// Microliters per second; the pipette default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLabwareParams {
    pub slot_name: String,
    pub load_name: String,
    pub namespace: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labware_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mount {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPipetteParams {
    pub pipette_name: String,
    pub mount: Mount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipette_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadModuleParams {
    pub model: String,
    pub slot_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeParams {
    /// Axes to home; all axes when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForResumeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayParams {
    pub seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
