//! Discrete power states derived from a voltage sample.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Volts};

/// Discrete power state of a device.
///
/// Variants are ordered by voltage band (Off < LowVoltage < On < OverVoltage),
/// which coincides with declaration order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PowerState {
    #[default]
    Off,
    LowVoltage,
    On,
    OverVoltage,
}

impl PowerState {
    /// Voltage at or below which a device is considered unpowered.
    pub const OFF_THRESHOLD: Volts = Fixed64::ONE;

    /// Classify a voltage sample against a working band.
    ///
    /// Precedence: `<= 1 V` is Off, then above `max` is OverVoltage, then
    /// below `min` is LowVoltage, otherwise On. A misconfigured band where
    /// `min > max` therefore still yields a total function.
    pub fn classify(voltage: Volts, min_working: Volts, max_working: Volts) -> Self {
        if voltage <= Self::OFF_THRESHOLD {
            PowerState::Off
        } else if voltage > max_working {
            PowerState::OverVoltage
        } else if voltage < min_working {
            PowerState::LowVoltage
        } else {
            PowerState::On
        }
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PowerState::Off => "off",
            PowerState::LowVoltage => "low-voltage",
            PowerState::On => "on",
            PowerState::OverVoltage => "over-voltage",
        };
        f.write_str(name)
    }
}
