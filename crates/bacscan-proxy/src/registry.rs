use crate::DeviceAnnouncement;
use bacscan_core::types::ObjectId;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Devices seen by one discovery pass, in arrival order.
///
/// Keyed by (address, device id): the first announcement for a key wins and
/// later ones are ignored. A new scan starts from an empty registry and
/// replaces the proxy's previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRegistry {
    devices: Vec<DeviceAnnouncement>,
    index: HashMap<(SocketAddr, ObjectId), usize>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an announcement. Returns false when the pair was already
    /// present.
    pub fn insert(&mut self, device: DeviceAnnouncement) -> bool {
        let key = (device.address, device.device_id);
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.devices.len());
        self.devices.push(device);
        true
    }

    pub fn get(&self, address: SocketAddr, device_id: ObjectId) -> Option<&DeviceAnnouncement> {
        self.index
            .get(&(address, device_id))
            .and_then(|slot| self.devices.get(*slot))
    }

    /// First device announced with this instance number.
    pub fn by_instance(&self, instance: u32) -> Option<&DeviceAnnouncement> {
        self.devices
            .iter()
            .find(|device| device.device_id.instance() == instance)
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut DeviceAnnouncement> {
        self.devices.get_mut(slot)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceAnnouncement> {
        self.devices.iter()
    }

    pub fn to_vec(&self) -> Vec<DeviceAnnouncement> {
        self.devices.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::DeviceRegistry;
    use crate::DeviceAnnouncement;
    use bacscan_core::types::{ObjectId, Segmentation};
    use std::net::SocketAddr;

    fn announcement(ip: [u8; 4], instance: u32, vendor_id: u32) -> DeviceAnnouncement {
        DeviceAnnouncement {
            address: SocketAddr::from((ip, 47808)),
            device_id: ObjectId::device(instance),
            max_apdu: 1476,
            segmentation: Segmentation::NoSegmentation,
            vendor_id,
            object_name: None,
        }
    }

    #[test]
    fn first_announcement_wins() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.insert(announcement([10, 0, 0, 2], 100, 1)));
        assert!(!registry.insert(announcement([10, 0, 0, 2], 100, 99)));
        assert_eq!(registry.len(), 1);
        let kept = registry
            .get(SocketAddr::from(([10, 0, 0, 2], 47808)), ObjectId::device(100))
            .unwrap();
        assert_eq!(kept.vendor_id, 1);
    }

    #[test]
    fn same_instance_at_two_addresses_is_two_devices() {
        let mut registry = DeviceRegistry::new();
        registry.insert(announcement([10, 0, 0, 3], 7, 1));
        registry.insert(announcement([10, 0, 0, 2], 7, 1));
        registry.insert(announcement([10, 0, 0, 4], 8, 1));
        assert_eq!(registry.len(), 3);
        let order: Vec<_> = registry.iter().map(|d| d.address.ip().to_string()).collect();
        assert_eq!(order, ["10.0.0.3", "10.0.0.2", "10.0.0.4"]);
        assert_eq!(
            registry.by_instance(7).map(|d| d.address.ip().to_string()),
            Some("10.0.0.3".to_string())
        );
        assert!(registry.by_instance(9).is_none());
    }
}
