//! Area Power Controller membership lists.

use apcnet_core::id::DeviceId;
use serde::{Deserialize, Serialize};

/// An Area Power Controller: the distribution point devices draw from.
///
/// Tracks two disjoint membership lists. Environmental devices (life support,
/// air alarms) are kept apart from general equipment. Both lists hold each
/// device at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apc {
    connected_devices: Vec<DeviceId>,
    environmental_devices: Vec<DeviceId>,
}

impl Apc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected_devices(&self) -> &[DeviceId] {
        &self.connected_devices
    }

    pub fn environmental_devices(&self) -> &[DeviceId] {
        &self.environmental_devices
    }

    fn list_mut(&mut self, environmental: bool) -> &mut Vec<DeviceId> {
        if environmental {
            &mut self.environmental_devices
        } else {
            &mut self.connected_devices
        }
    }

    /// Add a device to the matching list. Returns false if already present.
    pub fn add_device(&mut self, device: DeviceId, environmental: bool) -> bool {
        let list = self.list_mut(environmental);
        if list.contains(&device) {
            return false;
        }
        list.push(device);
        true
    }

    /// Remove a device from the matching list. Returns false if it was absent.
    pub fn remove_device(&mut self, device: DeviceId, environmental: bool) -> bool {
        let list = self.list_mut(environmental);
        match list.iter().position(|d| *d == device) {
            Some(idx) => {
                list.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    /// Whether the device is in either list.
    pub fn contains(&self, device: DeviceId) -> bool {
        self.connected_devices.contains(&device) || self.environmental_devices.contains(&device)
    }

    /// All members, connected devices first.
    pub fn members(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.connected_devices
            .iter()
            .chain(self.environmental_devices.iter())
            .copied()
    }

    pub fn len(&self) -> usize {
        self.connected_devices.len() + self.environmental_devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use slotmap::SlotMap;

    fn make_device_ids(count: usize) -> Vec<DeviceId> {
        let mut sm = SlotMap::<DeviceId, ()>::with_key();
        (0..count).map(|_| sm.insert(())).collect()
    }

    #[test]
    fn add_is_deduplicated() {
        let ids = make_device_ids(1);
        let mut apc = Apc::new();
        assert!(apc.add_device(ids[0], false));
        assert!(!apc.add_device(ids[0], false));
        assert_eq!(apc.connected_devices(), &[ids[0]]);
    }

    #[test]
    fn lists_are_independent() {
        let ids = make_device_ids(2);
        let mut apc = Apc::new();
        apc.add_device(ids[0], false);
        apc.add_device(ids[1], true);

        assert_eq!(apc.connected_devices(), &[ids[0]]);
        assert_eq!(apc.environmental_devices(), &[ids[1]]);
        assert_eq!(apc.len(), 2);
    }

    #[test]
    fn remove_absent_is_harmless() {
        let ids = make_device_ids(2);
        let mut apc = Apc::new();
        apc.add_device(ids[0], false);

        assert!(!apc.remove_device(ids[1], false));
        // Wrong list: membership is checked per list.
        assert!(!apc.remove_device(ids[0], true));
        assert!(apc.remove_device(ids[0], false));
        assert!(apc.is_empty());
    }

    #[test]
    fn members_covers_both_lists() {
        let ids = make_device_ids(3);
        let mut apc = Apc::new();
        apc.add_device(ids[0], false);
        apc.add_device(ids[1], true);
        apc.add_device(ids[2], false);

        let members: Vec<_> = apc.members().collect();
        assert_eq!(members.len(), 3);
        assert!(ids.iter().all(|id| apc.contains(*id)));
    }

    proptest! {
        #[test]
        fn membership_matches_model(
            ops in proptest::collection::vec((0usize..4, any::<bool>(), any::<bool>()), 0..50),
        ) {
            let ids = make_device_ids(4);
            let mut apc = Apc::new();
            let mut model: Vec<(DeviceId, bool)> = Vec::new();

            for (i, environmental, add) in ops {
                let id = ids[i];
                let present = model.contains(&(id, environmental));
                if add {
                    prop_assert_eq!(apc.add_device(id, environmental), !present);
                    if !present {
                        model.push((id, environmental));
                    }
                } else {
                    prop_assert_eq!(apc.remove_device(id, environmental), present);
                    model.retain(|entry| *entry != (id, environmental));
                }
            }

            prop_assert_eq!(apc.len(), model.len());
            for (id, environmental) in model {
                let list = if environmental {
                    apc.environmental_devices()
                } else {
                    apc.connected_devices()
                };
                prop_assert_eq!(list.iter().filter(|d| **d == id).count(), 1);
            }
        }
    }
}
