//! Helpers for tests: a handler that records what it was told, and
//! config shorthands.

use std::cell::RefCell;
use std::rc::Rc;

use apcnet_core::fixed::{Volts, f64_to_fixed64};
use apcnet_core::state::PowerState;

use crate::device::PoweredDeviceConfig;
use crate::handler::Powered;

/// One call received by a [`RecordingHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    State(PowerState),
    Voltage(Volts),
}

/// A [`Powered`] handler whose clones share one call log, so a test can keep
/// a clone after boxing the handler into a module.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    log: Rc<RefCell<Vec<Notification>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed clone sharing this handler's log.
    pub fn boxed(&self) -> Box<dyn Powered> {
        Box::new(self.clone())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.log.borrow().clone()
    }

    pub fn state_updates(&self) -> Vec<PowerState> {
        self.log
            .borrow()
            .iter()
            .filter_map(|n| match n {
                Notification::State(s) => Some(*s),
                Notification::Voltage(_) => None,
            })
            .collect()
    }

    pub fn voltage_updates(&self) -> Vec<Volts> {
        self.log
            .borrow()
            .iter()
            .filter_map(|n| match n {
                Notification::Voltage(v) => Some(*v),
                Notification::State(_) => None,
            })
            .collect()
    }
}

impl Powered for RecordingHandler {
    fn state_update(&mut self, state: PowerState) {
        self.log.borrow_mut().push(Notification::State(state));
    }

    fn power_network_update(&mut self, voltage: Volts) {
        self.log.borrow_mut().push(Notification::Voltage(voltage));
    }
}

/// Shorthand for a fixed-point value in test code (volts, watts or ohms).
pub fn volts(v: f64) -> Volts {
    f64_to_fixed64(v)
}

/// The default config: working band 190..=300 V.
pub fn standard_config() -> PoweredDeviceConfig {
    PoweredDeviceConfig::default()
}

/// Default thresholds with the given nominal draw.
pub fn config_with_watts(watts: f64) -> PoweredDeviceConfig {
    PoweredDeviceConfig::default().with_watt_usage(volts(watts))
}
