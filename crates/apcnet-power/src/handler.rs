//! The device-logic capability and the registry handlers are bound from.

use std::collections::HashMap;

use apcnet_core::fixed::Volts;
use apcnet_core::id::DeviceId;
use apcnet_core::state::PowerState;

/// Device-specific logic that reacts to power (a light, a door, a vending
/// machine).
///
/// A device calls exactly one of these per voltage sample: `state_update`
/// when it derives discrete states itself, `power_network_update` when
/// control is delegated to the handler.
pub trait Powered {
    /// The device's discrete power state changed (or is being re-applied).
    fn state_update(&mut self, state: PowerState);

    /// Raw voltage sample, only delivered to handlers with delegated control.
    fn power_network_update(&mut self, voltage: Volts);
}

/// Handlers waiting to be bound to their device, keyed by device identity.
///
/// A device claims its handler lazily the first time one of its hooks runs;
/// once claimed the handler lives on the device and the registry no longer
/// holds it.
#[derive(Default)]
pub struct HandlerRegistry {
    unbound: HashMap<DeviceId, Box<dyn Powered>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("unbound", &self.unbound.len())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a handler for a device. Returns any handler it replaces.
    pub fn register(
        &mut self,
        device: DeviceId,
        handler: Box<dyn Powered>,
    ) -> Option<Box<dyn Powered>> {
        self.unbound.insert(device, handler)
    }

    /// Claim the handler offered for a device, if any.
    pub fn take(&mut self, device: DeviceId) -> Option<Box<dyn Powered>> {
        self.unbound.remove(&device)
    }

    pub fn contains(&self, device: DeviceId) -> bool {
        self.unbound.contains_key(&device)
    }

    pub fn len(&self) -> usize {
        self.unbound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unbound.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingHandler;
    use slotmap::SlotMap;

    #[test]
    fn take_removes_handler() {
        let id = SlotMap::<DeviceId, ()>::with_key().insert(());
        let mut registry = HandlerRegistry::new();
        registry.register(id, RecordingHandler::new().boxed());

        assert!(registry.contains(id));
        assert!(registry.take(id).is_some());
        assert!(registry.take(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn register_replaces_previous_offer() {
        let id = SlotMap::<DeviceId, ()>::with_key().insert(());
        let mut registry = HandlerRegistry::new();
        assert!(registry.register(id, RecordingHandler::new().boxed()).is_none());
        assert!(registry.register(id, RecordingHandler::new().boxed()).is_some());
        assert_eq!(registry.len(), 1);
    }
}
