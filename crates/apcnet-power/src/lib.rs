//! APC-powered devices.
//!
//! A powered device sits between the electrical grid solver and
//! device-specific logic. Each tick the solver feeds it a voltage; the device
//! thresholds that voltage into a [`PowerState`] and tells its [`Powered`]
//! handler when the state changes. The state is a replicated field, so
//! observers mirror it and re-apply it to their own handlers.
//!
//! # Design
//!
//! - Devices and APCs live in slotmaps owned by a [`PowerDeviceModule`].
//! - A device's APC association is a plain [`ApcId`]: a weak reference that
//!   may outlive the APC. Membership lives in the APC's two lists.
//! - Handlers are offered to a [`HandlerRegistry`] keyed by [`DeviceId`] and
//!   bound lazily by the device's hooks; a missing handler makes
//!   notification a silent no-op.
//! - Events fire only on *transitions*, not every tick.

pub mod apc;
pub mod device;
pub mod handler;
pub mod module;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use apc::Apc;
pub use device::{DEFAULT_RESISTANCE, PoweredDevice, PoweredDeviceConfig};
pub use handler::{HandlerRegistry, Powered};
pub use module::PowerDeviceModule;

pub use apcnet_core::fixed::Volts;
pub use apcnet_core::id::{ApcId, DeviceId};
pub use apcnet_core::state::PowerState;
