//! Access to the configured devices and zones

use lighting::{Device, LightTarget, LightingError, Zone};
use parking_lot::RwLock;

/// Read access to the device and zone records of the configuration store
pub trait TargetProvider: Send + Sync {
    fn devices(&self) -> Vec<Device>;

    fn zones(&self) -> Vec<Zone>;

    /// Delivery targets for the current records
    fn targets(&self) -> Vec<LightTarget> {
        LightTarget::expand(&self.devices(), &self.zones())
    }
}

/// Targets kept in memory, with simple get/set accessors
#[derive(Debug, Default)]
pub struct InMemoryTargets {
    devices: RwLock<Vec<Device>>,
    zones: RwLock<Vec<Zone>>,
}

impl InMemoryTargets {
    pub fn new(devices: Vec<Device>, zones: Vec<Zone>) -> Self {
        Self {
            devices: RwLock::new(devices),
            zones: RwLock::new(zones),
        }
    }

    pub fn device(&self, id: &str) -> Option<Device> {
        self.devices.read().iter().find(|d| d.id == id).cloned()
    }

    /// Insert or replace a device by id
    pub fn upsert_device(&self, device: Device) {
        let mut devices = self.devices.write();
        match devices.iter_mut().find(|d| d.id == device.id) {
            Some(existing) => *existing = device,
            None => devices.push(device),
        }
    }

    /// Remove a device together with its zones
    pub fn remove_device(&self, id: &str) -> Option<Device> {
        let removed = {
            let mut devices = self.devices.write();
            let index = devices.iter().position(|d| d.id == id)?;
            devices.remove(index)
        };
        self.zones.write().retain(|z| z.device_id != id);
        Some(removed)
    }

    /// Insert or replace a zone by id
    ///
    /// The zone's device must exist and its LED range must not be inverted.
    pub fn upsert_zone(&self, zone: Zone) -> Result<(), LightingError> {
        if zone.led_start > zone.led_end {
            return Err(LightingError::InvalidTarget(format!(
                "zone {} has start {} after end {}",
                zone.id, zone.led_start, zone.led_end
            )));
        }
        if self.device(&zone.device_id).is_none() {
            return Err(LightingError::InvalidTarget(format!(
                "zone {} refers to unknown device {}",
                zone.id, zone.device_id
            )));
        }

        let mut zones = self.zones.write();
        match zones.iter_mut().find(|z| z.id == zone.id) {
            Some(existing) => *existing = zone,
            None => zones.push(zone),
        }
        Ok(())
    }

    pub fn remove_zone(&self, id: &str) -> Option<Zone> {
        let mut zones = self.zones.write();
        let index = zones.iter().position(|z| z.id == id)?;
        Some(zones.remove(index))
    }
}

impl TargetProvider for InMemoryTargets {
    fn devices(&self) -> Vec<Device> {
        self.devices.read().clone()
    }

    fn zones(&self) -> Vec<Zone> {
        self.zones.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_targets() {
        let store = InMemoryTargets::default();
        store.upsert_device(Device::new("strip", "10.0.0.1"));
        store.upsert_device(Device::new("lamp", "10.0.0.2"));
        store.upsert_zone(Zone::new("top", "strip", 0, 9)).unwrap();

        let ids: Vec<String> = store.targets().iter().map(LightTarget::id).collect();
        assert_eq!(ids, vec!["strip/top", "lamp"]);

        store.upsert_device(Device::new("lamp", "10.0.0.9"));
        assert_eq!(store.device("lamp").unwrap().address, "10.0.0.9");
        assert_eq!(store.devices().len(), 2);
    }

    #[test]
    fn test_invalid_zone_is_rejected() {
        let store = InMemoryTargets::new(vec![Device::new("strip", "h")], Vec::new());
        assert!(store.upsert_zone(Zone::new("z", "strip", 9, 0)).is_err());
        assert!(store.upsert_zone(Zone::new("z", "nope", 0, 9)).is_err());
        assert!(store.zones().is_empty());
    }

    #[test]
    fn test_remove_device_drops_its_zones() {
        let store = InMemoryTargets::new(
            vec![Device::new("strip", "h")],
            vec![Zone::new("z", "strip", 0, 1)],
        );
        assert!(store.remove_device("strip").is_some());
        assert!(store.zones().is_empty());
        assert!(store.remove_device("strip").is_none());
        assert!(store.remove_zone("z").is_none());
    }
}
