//! APC Net Core -- shared vocabulary for APC-powered devices.
//!
//! This crate holds the types every participant in an APC power simulation
//! agrees on: entity identifiers, deterministic fixed-point electrical units,
//! the discrete [`state::PowerState`], the device event bus, the replicated
//! field primitive used to mirror state to observers, and the versioned
//! snapshot header.
//!
//! # Key Types
//!
//! - [`id::DeviceId`] / [`id::ApcId`] -- slotmap keys for devices and APCs.
//! - [`fixed::Volts`] -- Q32.32 fixed-point voltage (alias of [`fixed::Fixed64`]).
//! - [`state::PowerState`] -- Off, LowVoltage, On, OverVoltage.
//! - [`event::EventBus`] -- synchronous observers plus bounded history.
//! - [`sync::SyncVar`] -- a value with change tracking for replication.
//! - [`serialize::SnapshotHeader`] -- magic + version prefix for saved state.

pub mod event;
pub mod fixed;
pub mod id;
pub mod serialize;
pub mod state;
pub mod sync;
