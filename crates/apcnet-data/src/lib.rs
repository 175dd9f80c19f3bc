//! Data-driven device configuration.
//!
//! Device types are declared in a `devices.{ron,toml,json}` file, validated,
//! and resolved into [`PoweredDeviceConfig`](apcnet_power::PoweredDeviceConfig)
//! values that a [`DeviceCatalog`] can spawn by name.

pub mod catalog;
pub mod loader;
pub mod schema;

pub use catalog::{DeviceCatalog, load_device_catalog};
pub use loader::DataLoadError;
