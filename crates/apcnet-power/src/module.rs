//! The device module: owns APCs, devices, unbound handlers and the event bus,
//! and is the entry point for every device operation.

use apcnet_core::event::{DeviceEvent, EventBus, StateOrigin};
use apcnet_core::fixed::{Volts, Watts};
use apcnet_core::id::{ApcId, DeviceId};
use apcnet_core::serialize::{
    DeserializeError, SerializeError, SnapshotHeader, decode, encode,
};
use apcnet_core::state::PowerState;
use apcnet_core::sync::{NetworkRole, StateReplication};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::apc::Apc;
use crate::device::{PoweredDevice, PoweredDeviceConfig};
use crate::handler::{HandlerRegistry, Powered};

/// Manages APCs and the devices attached to them for one participant.
///
/// Each participant (the authority and every observer) runs its own module.
/// The authority derives states from voltage samples and drains replication
/// messages; observers apply those messages through the state change hook.
#[derive(Debug)]
pub struct PowerDeviceModule {
    role: NetworkRole,
    apcs: SlotMap<ApcId, Apc>,
    devices: SlotMap<DeviceId, PoweredDevice>,
    handlers: HandlerRegistry,
    events: EventBus,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    header: SnapshotHeader,
    apcs: &'a SlotMap<ApcId, Apc>,
    devices: &'a SlotMap<DeviceId, PoweredDevice>,
}

#[derive(Deserialize)]
struct Snapshot {
    header: SnapshotHeader,
    apcs: SlotMap<ApcId, Apc>,
    devices: SlotMap<DeviceId, PoweredDevice>,
}

impl PowerDeviceModule {
    pub fn new(role: NetworkRole) -> Self {
        Self {
            role,
            apcs: SlotMap::with_key(),
            devices: SlotMap::with_key(),
            handlers: HandlerRegistry::new(),
            events: EventBus::default(),
        }
    }

    pub fn role(&self) -> NetworkRole {
        self.role
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // -----------------------------------------------------------------------
    // APCs
    // -----------------------------------------------------------------------

    pub fn create_apc(&mut self) -> ApcId {
        self.apcs.insert(Apc::new())
    }

    /// Remove an APC. Devices that pointed at it keep their (now stale)
    /// association; a later `set_apc` replaces it.
    pub fn remove_apc(&mut self, apc: ApcId) -> Option<Apc> {
        self.apcs.remove(apc)
    }

    pub fn apc(&self, apc: ApcId) -> Option<&Apc> {
        self.apcs.get(apc)
    }

    pub fn apcs(&self) -> impl Iterator<Item = (ApcId, &Apc)> {
        self.apcs.iter()
    }

    // -----------------------------------------------------------------------
    // Device lifecycle
    // -----------------------------------------------------------------------

    /// Create a device and run its awake hook, binding `handler` if given.
    pub fn spawn_device(
        &mut self,
        config: PoweredDeviceConfig,
        handler: Option<Box<dyn Powered>>,
    ) -> DeviceId {
        self.spawn_device_with_state(config, PowerState::default(), handler)
    }

    /// Create a device whose state was persisted elsewhere.
    pub fn spawn_device_with_state(
        &mut self,
        config: PoweredDeviceConfig,
        state: PowerState,
        handler: Option<Box<dyn Powered>>,
    ) -> DeviceId {
        let id = self.devices.insert(PoweredDevice::with_state(config, state));
        if let Some(handler) = handler {
            self.handlers.register(id, handler);
        }
        self.ensure_init(id);
        id
    }

    /// Offer a handler to a device. It is bound on the device's next hook
    /// (start, network start, or replicated state) unless one is bound already.
    pub fn attach_handler(&mut self, device: DeviceId, handler: Box<dyn Powered>) {
        if !self.devices.contains_key(device) {
            tracing::warn!(?device, "attach_handler on unknown device");
            return;
        }
        self.handlers.register(device, handler);
    }

    fn ensure_init(&mut self, device: DeviceId) {
        if let Some(d) = self.devices.get_mut(device)
            && d.ensure_init(device, &mut self.handlers)
        {
            tracing::debug!(?device, "handler bound");
        }
    }

    /// Simulation start: derive resistance from a configured wattage and
    /// register with the associated APC, if any.
    pub fn start_device(&mut self, device: DeviceId) {
        let Some(d) = self.devices.get_mut(device) else {
            tracing::warn!(?device, "start_device on unknown device");
            return;
        };
        tracing::trace!(?device, state = %d.state(), "device starting");
        d.derive_resistance();
        if d.related_apc().is_some() {
            self.register_membership(device);
        }
    }

    /// Network start as this module's role. Re-binds the handler and runs
    /// the state change hook with the current state, so a late joiner's
    /// handler sees the right state.
    pub fn start_network(&mut self, device: DeviceId) {
        self.ensure_init(device);
        let Some(d) = self.devices.get(device) else {
            tracing::warn!(?device, "start_network on unknown device");
            return;
        };
        tracing::debug!(?device, role = ?self.role, "network start");
        let state = d.state();
        self.on_state_synchronised(device, state);
    }

    /// Run [`start_network`](Self::start_network) for every device.
    pub fn start_network_all(&mut self) {
        let ids: Vec<DeviceId> = self.devices.keys().collect();
        for id in ids {
            self.start_network(id);
        }
    }

    /// Disable hook: leave the APC's lists unconditionally.
    pub fn disable_device(&mut self, device: DeviceId) {
        self.remove_from_apc(device);
    }

    /// Disable and destroy a device, dropping any handler it owned or was offered.
    pub fn despawn_device(&mut self, device: DeviceId) -> Option<PoweredDevice> {
        self.disable_device(device);
        self.handlers.take(device);
        self.devices.remove(device)
    }

    pub fn device(&self, device: DeviceId) -> Option<&PoweredDevice> {
        self.devices.get(device)
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &PoweredDevice)> {
        self.devices.iter()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Change a device's nominal draw; resistance follows.
    pub fn set_watt_usage(&mut self, device: DeviceId, watts: Watts) {
        match self.devices.get_mut(device) {
            Some(d) => d.set_watt_usage(watts),
            None => tracing::warn!(?device, "set_watt_usage on unknown device"),
        }
    }

    // -----------------------------------------------------------------------
    // APC membership
    // -----------------------------------------------------------------------

    /// Associate a device with an APC, leaving any previous APC first.
    ///
    /// The device lands in the APC's environmental or connected list
    /// according to its configuration, never both and never twice. For an
    /// unknown APC the device still leaves its previous list but keeps its
    /// previous association.
    pub fn set_apc(&mut self, device: DeviceId, apc: ApcId) {
        if !self.devices.contains_key(device) {
            tracing::warn!(?device, "set_apc on unknown device");
            return;
        }
        self.remove_from_apc(device);
        if !self.apcs.contains_key(apc) {
            tracing::warn!(?device, ?apc, "set_apc to unknown APC");
            return;
        }
        if let Some(d) = self.devices.get_mut(device) {
            d.set_related_apc(Some(apc));
        }
        self.register_membership(device);
    }

    fn register_membership(&mut self, device: DeviceId) {
        let Some(d) = self.devices.get(device) else {
            return;
        };
        let Some(apc_id) = d.related_apc() else {
            return;
        };
        let environmental = d.is_environmental();
        let Some(apc) = self.apcs.get_mut(apc_id) else {
            tracing::warn!(?device, apc = ?apc_id, "associated APC no longer exists");
            return;
        };
        if apc.add_device(device, environmental) {
            tracing::debug!(?device, apc = ?apc_id, environmental, "joined APC");
            self.events.emit(DeviceEvent::ApcAssigned {
                device,
                apc: apc_id,
                environmental,
            });
        }
    }

    /// Leave the associated APC's list.
    ///
    /// The association itself is kept: removal clears membership, not the
    /// back-reference. Safe to call when absent from the list or unassociated.
    pub fn remove_from_apc(&mut self, device: DeviceId) {
        let Some(d) = self.devices.get(device) else {
            return;
        };
        let Some(apc_id) = d.related_apc() else {
            return;
        };
        let environmental = d.is_environmental();
        if let Some(apc) = self.apcs.get_mut(apc_id)
            && apc.remove_device(device, environmental)
        {
            tracing::debug!(?device, apc = ?apc_id, "left APC");
            self.events.emit(DeviceEvent::ApcDetached {
                device,
                apc: apc_id,
            });
        }
    }

    /// An APC announcing itself to a device. The first APC to reach an
    /// unassociated device claims it; existing associations are kept.
    /// Returns true if the device was claimed by this call.
    pub fn broadcast_to_device(&mut self, device: DeviceId, apc: ApcId) -> bool {
        let unassociated = self
            .devices
            .get(device)
            .is_some_and(|d| d.related_apc().is_none());
        if !unassociated {
            return false;
        }
        self.set_apc(device, apc);
        self.devices
            .get(device)
            .is_some_and(|d| d.related_apc() == Some(apc))
    }

    /// Broadcast from an APC to every listed device. Returns how many it claimed.
    pub fn broadcast_from_apc(&mut self, apc: ApcId, devices: &[DeviceId]) -> usize {
        devices
            .iter()
            .filter(|&&device| self.broadcast_to_device(device, apc))
            .count()
    }

    // -----------------------------------------------------------------------
    // Power updates
    // -----------------------------------------------------------------------

    /// Feed one voltage sample to a device (called once per tick by the grid solver).
    pub fn power_network_update(&mut self, device: DeviceId, voltage: Volts) {
        let Some(d) = self.devices.get_mut(device) else {
            tracing::warn!(?device, "power_network_update on unknown device");
            return;
        };
        if let Some((from, to)) = d.power_network_update(voltage) {
            tracing::trace!(?device, %from, %to, "power state changed");
            self.events.emit(DeviceEvent::StateChanged {
                device,
                from,
                to,
                origin: StateOrigin::Local,
            });
        }
    }

    /// Feed the same voltage to every member of an APC.
    pub fn distribute_voltage(&mut self, apc: ApcId, voltage: Volts) {
        let Some(a) = self.apcs.get(apc) else {
            tracing::warn!(?apc, "distribute_voltage on unknown APC");
            return;
        };
        let members: Vec<DeviceId> = a.members().collect();
        for device in members {
            self.power_network_update(device, voltage);
        }
    }

    // -----------------------------------------------------------------------
    // Replication
    // -----------------------------------------------------------------------

    fn on_state_synchronised(&mut self, device: DeviceId, state: PowerState) -> bool {
        self.ensure_init(device);
        let Some(d) = self.devices.get_mut(device) else {
            return false;
        };
        let Some(from) = d.update_synchronised_state(state) else {
            return false;
        };
        tracing::trace!(?device, %from, to = %state, "replicated state changing");
        self.events.emit(DeviceEvent::StateChanged {
            device,
            from,
            to: state,
            origin: StateOrigin::Replicated,
        });
        true
    }

    /// Drain every dirty state into replication messages.
    pub fn collect_replication(&mut self) -> Vec<StateReplication> {
        self.devices
            .iter_mut()
            .filter_map(|(device, d)| {
                d.take_dirty_state()
                    .map(|state| StateReplication { device, state })
            })
            .collect()
    }

    /// Queue every device's current state for sending, e.g. to a late joiner.
    pub fn mark_all_for_replication(&mut self) {
        for (_, d) in self.devices.iter_mut() {
            d.mark_state_dirty();
        }
    }

    /// Apply a message from the authority through the state change hook.
    /// Returns true if the device's state changed. The authority derives its
    /// own states, so it ignores inbound messages.
    pub fn apply_replication(&mut self, message: StateReplication) -> bool {
        if self.role == NetworkRole::Authority {
            tracing::warn!(device = ?message.device, "authority ignores inbound replication");
            return false;
        }
        if !self.devices.contains_key(message.device) {
            tracing::warn!(device = ?message.device, "replication for unknown device");
            return false;
        }
        self.on_state_synchronised(message.device, message.state)
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Serialize APCs and devices. Handlers and listeners are not included.
    pub fn snapshot(&self, tick: u64) -> Result<Vec<u8>, SerializeError> {
        encode(&SnapshotRef {
            header: SnapshotHeader::new(tick),
            apcs: &self.apcs,
            devices: &self.devices,
        })
    }

    /// Rebuild a module from [`snapshot`](Self::snapshot) output. Handlers
    /// must be attached again; they bind on each device's next hook.
    pub fn restore(data: &[u8], role: NetworkRole) -> Result<Self, DeserializeError> {
        let snapshot: Snapshot = decode(data)?;
        snapshot.header.validate()?;
        Ok(Self {
            role,
            apcs: snapshot.apcs,
            devices: snapshot.devices,
            handlers: HandlerRegistry::new(),
            events: EventBus::default(),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
