//! On-disk shapes for device configuration files.
//!
//! Values are plain `f64` here; they are converted to fixed-point once,
//! when the catalog is resolved.

use serde::Deserialize;

fn default_min_working_voltage() -> f64 {
    190.0
}

fn default_max_working_voltage() -> f64 {
    300.0
}

fn default_watt_usage() -> f64 {
    0.01
}

fn default_true() -> bool {
    true
}

/// A named device type. Every setting except the name is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceTypeData {
    pub name: String,
    #[serde(default = "default_min_working_voltage")]
    pub min_working_voltage: f64,
    #[serde(default = "default_max_working_voltage")]
    pub max_working_voltage: f64,
    #[serde(default)]
    pub is_environmental_device: bool,
    #[serde(default = "default_watt_usage")]
    pub watt_usage: f64,
    #[serde(default)]
    pub advanced_control_delegated: bool,
    #[serde(default = "default_true")]
    pub state_update_on_client: bool,
}
