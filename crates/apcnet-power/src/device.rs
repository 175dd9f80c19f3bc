//! A single APC-powered device: thresholds, derived resistance, and the
//! replicated power state.
//!
//! The device knows nothing about APC membership lists; the owning
//! [`PowerDeviceModule`](crate::PowerDeviceModule) keeps those consistent.

use apcnet_core::fixed::{Fixed64, Ohms, Volts, Watts, f64_to_fixed64, resistance_for_watts};
use apcnet_core::id::{ApcId, DeviceId};
use apcnet_core::state::PowerState;
use apcnet_core::sync::SyncVar;
use serde::{Deserialize, Serialize};

use crate::handler::{HandlerRegistry, Powered};

/// Resistance reported before any wattage has been applied.
pub const DEFAULT_RESISTANCE: Ohms = Fixed64::from_bits(99_999_999_i64 << 32);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Editor-settable device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoweredDeviceConfig {
    /// Below this the device browns out (LowVoltage).
    pub min_working_voltage: Volts,
    /// Above this the device is over-driven (OverVoltage).
    pub max_working_voltage: Volts,
    /// Selects the APC's environmental list instead of its connected list.
    pub is_environmental_device: bool,
    /// Nominal draw, from which the equivalent resistance is derived.
    pub watt_usage: Watts,
    /// Forward raw voltage to the handler instead of a derived state.
    pub advanced_control_delegated: bool,
    /// Re-apply replicated state to the local handler.
    pub state_update_on_client: bool,
}

impl Default for PoweredDeviceConfig {
    fn default() -> Self {
        Self {
            min_working_voltage: Fixed64::from_num(190),
            max_working_voltage: Fixed64::from_num(300),
            is_environmental_device: false,
            watt_usage: f64_to_fixed64(0.01),
            advanced_control_delegated: false,
            state_update_on_client: true,
        }
    }
}

impl PoweredDeviceConfig {
    pub fn with_thresholds(mut self, min: Volts, max: Volts) -> Self {
        self.min_working_voltage = min;
        self.max_working_voltage = max;
        self
    }

    pub fn with_watt_usage(mut self, watts: Watts) -> Self {
        self.watt_usage = watts;
        self
    }

    pub fn environmental(mut self, environmental: bool) -> Self {
        self.is_environmental_device = environmental;
        self
    }

    pub fn delegated(mut self, delegated: bool) -> Self {
        self.advanced_control_delegated = delegated;
        self
    }

    pub fn state_update_on_client(mut self, enabled: bool) -> Self {
        self.state_update_on_client = enabled;
        self
    }

    /// Classify a voltage sample against this device's working band.
    pub fn classify(&self, voltage: Volts) -> PowerState {
        PowerState::classify(voltage, self.min_working_voltage, self.max_working_voltage)
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// A powered device. Handlers are not persisted; a restored device binds its
/// handler again from the registry on its next hook.
#[derive(Serialize, Deserialize)]
pub struct PoweredDevice {
    config: PoweredDeviceConfig,
    resistance: Ohms,
    /// Weak back-reference: the APC may be gone, and membership is tracked
    /// by the APC, not here.
    related_apc: Option<ApcId>,
    state: SyncVar<PowerState>,
    #[serde(skip)]
    handler: Option<Box<dyn Powered>>,
}

impl std::fmt::Debug for PoweredDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoweredDevice")
            .field("config", &self.config)
            .field("resistance", &self.resistance)
            .field("related_apc", &self.related_apc)
            .field("state", &self.state)
            .field("handler", &self.handler.as_ref().map(|_| "<dyn Powered>"))
            .finish()
    }
}

impl PoweredDevice {
    pub fn new(config: PoweredDeviceConfig) -> Self {
        Self::with_state(config, PowerState::default())
    }

    /// Create a device starting from a persisted state.
    pub fn with_state(config: PoweredDeviceConfig, state: PowerState) -> Self {
        Self {
            config,
            resistance: DEFAULT_RESISTANCE,
            related_apc: None,
            state: SyncVar::new(state),
            handler: None,
        }
    }

    pub fn config(&self) -> &PoweredDeviceConfig {
        &self.config
    }

    pub fn resistance(&self) -> Ohms {
        self.resistance
    }

    pub fn related_apc(&self) -> Option<ApcId> {
        self.related_apc
    }

    pub(crate) fn set_related_apc(&mut self, apc: Option<ApcId>) {
        self.related_apc = apc;
    }

    pub fn state(&self) -> PowerState {
        self.state.get()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn is_environmental(&self) -> bool {
        self.config.is_environmental_device
    }

    /// Change the nominal draw and re-derive resistance.
    pub fn set_watt_usage(&mut self, watts: Watts) {
        self.config.watt_usage = watts;
        self.derive_resistance();
    }

    /// Recompute resistance from the configured wattage. Non-positive
    /// wattage leaves the current resistance in place.
    pub fn derive_resistance(&mut self) {
        if let Some(r) = resistance_for_watts(self.config.watt_usage) {
            self.resistance = r;
        }
    }

    /// Bind the handler offered for `id`, unless one is already bound.
    /// Returns true if a handler was bound by this call.
    pub fn ensure_init(&mut self, id: DeviceId, registry: &mut HandlerRegistry) -> bool {
        if self.handler.is_some() {
            return false;
        }
        self.handler = registry.take(id);
        self.handler.is_some()
    }

    /// Apply one voltage sample.
    ///
    /// With delegated control and a bound handler the raw voltage is
    /// forwarded and no state is derived. Otherwise the state is derived
    /// from the thresholds; on a change it is stored and, if a handler is
    /// bound, the handler is told. Returns the `(old, new)` transition.
    pub fn power_network_update(&mut self, voltage: Volts) -> Option<(PowerState, PowerState)> {
        if self.config.advanced_control_delegated
            && let Some(handler) = self.handler.as_mut()
        {
            handler.power_network_update(voltage);
            return None;
        }

        let new_state = self.config.classify(voltage);
        let old_state = self.state.set(new_state)?;
        if let Some(handler) = self.handler.as_mut() {
            handler.state_update(new_state);
        }
        Some((old_state, new_state))
    }

    /// Change hook for the replicated state field.
    ///
    /// Stores `state` and, when `state_update_on_client` is set, re-applies it
    /// to the bound handler even if it did not change. Returns the previous
    /// state if it differed.
    pub fn update_synchronised_state(&mut self, state: PowerState) -> Option<PowerState> {
        let old = self.state.apply_remote(state);
        if self.config.state_update_on_client
            && let Some(handler) = self.handler.as_mut()
        {
            handler.state_update(state);
        }
        (old != state).then_some(old)
    }

    pub(crate) fn take_dirty_state(&mut self) -> Option<PowerState> {
        self.state.take_dirty()
    }

    pub(crate) fn mark_state_dirty(&mut self) {
        self.state.mark_dirty();
    }
}
