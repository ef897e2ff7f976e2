// ── Fleet snapshot ──
//
// Enrichment of raw tool records, the change detector, and the sort and
// grouping policy for the published view.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;
use simfleet_api::RawDeviceEntry;

use crate::metadata::MetadataLookup;
use crate::model::{Device, DeviceId, DeviceKind, DeviceState, extract_version, format_display_name};

/// Devices sharing one runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceGroup {
    pub runtime_key: String,
    pub display_name: String,
    pub devices: Vec<Device>,
}

/// Ordered groups plus the flat device list they were built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub groups: Vec<DeviceGroup>,
    pub devices: Vec<Device>,
}

// ── Enrichment ──────────────────────────────────────────────────────

/// Turn raw records into candidate devices, first occurrence of a UDID wins.
pub fn enrich_devices(raw: Vec<RawDeviceEntry>, lookup: &MetadataLookup) -> Vec<Device> {
    let mut seen = HashSet::with_capacity(raw.len());
    raw.into_iter()
        .filter(|entry| seen.insert(entry.device.udid.clone()))
        .map(|entry| {
            let RawDeviceEntry { runtime_key, device } = entry;
            let metadata = lookup.lookup(device.device_type_identifier.as_deref(), &device.name);
            let kind = metadata
                .as_ref()
                .map(|m| m.classification)
                .filter(|k| *k != DeviceKind::Other)
                .unwrap_or_else(|| DeviceKind::from_name(&device.name));
            let (screen, physical, logical) = match metadata {
                Some(m) => (
                    m.screen_size_inches.unwrap_or(0.0),
                    m.physical_resolution.unwrap_or_default(),
                    m.logical_resolution.unwrap_or_default(),
                ),
                None => (0.0, String::new(), String::new()),
            };
            Device {
                id: DeviceId::from(device.udid),
                state: DeviceState::from(device.state),
                is_available: device.is_available.unwrap_or(true),
                name: device.name,
                runtime_key,
                device_type_id: device.device_type_identifier,
                kind,
                screen_size_inches: screen,
                physical_resolution: physical,
                logical_resolution: logical,
            }
        })
        .collect()
}

// ── Change detection ────────────────────────────────────────────────

/// Whether `new` differs from `old` in anything the view shows.
///
/// Only membership, state, name and runtime count; metadata churn does not.
pub fn has_meaningful_change(old: &[Device], new: &[Device]) -> bool {
    if old.len() != new.len() {
        return true;
    }
    let previous: HashMap<&DeviceId, &Device> = old.iter().map(|d| (&d.id, d)).collect();
    new.iter().any(|device| match previous.get(&device.id) {
        None => true,
        Some(prev) => {
            prev.state != device.state
                || prev.name != device.name
                || prev.runtime_key != device.runtime_key
        }
    })
}

// ── Ordering ────────────────────────────────────────────────────────

fn compare_in_group(a: &Device, b: &Device) -> Ordering {
    a.kind
        .cmp(&b.kind)
        .then_with(|| b.screen_size_inches.total_cmp(&a.screen_size_inches))
        .then_with(|| a.name.cmp(&b.name))
}

fn compare_flat(a: &Device, b: &Device) -> Ordering {
    extract_version(&b.runtime_key)
        .total_cmp(&extract_version(&a.runtime_key))
        .then_with(|| compare_in_group(a, b))
}

fn compare_groups(a: &DeviceGroup, b: &DeviceGroup) -> Ordering {
    extract_version(&b.runtime_key)
        .total_cmp(&extract_version(&a.runtime_key))
        .then_with(|| a.runtime_key.cmp(&b.runtime_key))
}

impl FleetSnapshot {
    /// Sort and group candidate devices.
    ///
    /// Every key in `installed_runtime_keys` gets a group even with no devices.
    pub fn build(mut devices: Vec<Device>, installed_runtime_keys: &BTreeSet<String>) -> Self {
        devices.sort_by(compare_flat);

        let mut groups: IndexMap<String, DeviceGroup> = installed_runtime_keys
            .iter()
            .map(|key| (key.clone(), DeviceGroup::empty(key)))
            .collect();
        for device in &devices {
            groups
                .entry(device.runtime_key.clone())
                .or_insert_with(|| DeviceGroup::empty(&device.runtime_key))
                .devices
                .push(device.clone());
        }

        let mut groups: Vec<DeviceGroup> = groups.into_values().collect();
        for group in &mut groups {
            group.devices.sort_by(compare_in_group);
        }
        groups.sort_by(compare_groups);

        Self { groups, devices }
    }

    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| &d.id == id)
    }

    pub fn group(&self, runtime_key: &str) -> Option<&DeviceGroup> {
        self.groups.iter().find(|g| g.runtime_key == runtime_key)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Copy with the given states substituted in both the flat list and
    /// the groups. Order is left untouched.
    pub(crate) fn with_states(&self, states: &HashMap<&DeviceId, &DeviceState>) -> Self {
        let patch = |device: &Device| match states.get(&device.id) {
            Some(state) if **state != device.state => device.with_state((*state).clone()),
            _ => device.clone(),
        };
        Self {
            devices: self.devices.iter().map(patch).collect(),
            groups: self
                .groups
                .iter()
                .map(|g| DeviceGroup {
                    runtime_key: g.runtime_key.clone(),
                    display_name: g.display_name.clone(),
                    devices: g.devices.iter().map(patch).collect(),
                })
                .collect(),
        }
    }
}

impl DeviceGroup {
    fn empty(runtime_key: &str) -> Self {
        Self {
            runtime_key: runtime_key.to_owned(),
            display_name: format_display_name(runtime_key),
            devices: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simfleet_api::RawDevice;

    const IOS_17: &str = "com.apple.CoreSimulator.SimRuntime.iOS-17-5";
    const IOS_18: &str = "com.apple.CoreSimulator.SimRuntime.iOS-18-0";

    fn device(id: &str, name: &str, kind: DeviceKind, screen: f64, runtime: &str) -> Device {
        Device {
            id: DeviceId::from(id),
            name: name.into(),
            state: DeviceState::Shutdown,
            runtime_key: runtime.into(),
            device_type_id: None,
            kind,
            screen_size_inches: screen,
            physical_resolution: String::new(),
            logical_resolution: String::new(),
            is_available: true,
        }
    }

    fn raw(udid: &str, name: &str, state: &str, runtime: &str) -> RawDeviceEntry {
        RawDeviceEntry {
            runtime_key: runtime.into(),
            device: RawDevice {
                udid: udid.into(),
                name: name.into(),
                state: state.into(),
                device_type_identifier: None,
                is_available: Some(true),
                availability_error: None,
                last_booted_at: None,
            },
        }
    }

    #[test]
    fn group_order_is_kind_then_screen_then_name() {
        let devices = vec![
            device("3", "iPad Air", DeviceKind::Tablet, 11.0, IOS_18),
            device("2", "iPhone SE", DeviceKind::Phone, 4.7, IOS_18),
            device("1", "iPhone 16", DeviceKind::Phone, 6.1, IOS_18),
        ];
        let snapshot = FleetSnapshot::build(devices, &BTreeSet::new());
        let names: Vec<_> = snapshot.groups[0].devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["iPhone 16", "iPhone SE", "iPad Air"]);
    }

    #[test]
    fn groups_order_by_version_descending() {
        let devices = vec![
            device("1", "iPhone 15", DeviceKind::Phone, 6.1, IOS_17),
            device("2", "iPhone 16", DeviceKind::Phone, 6.1, IOS_18),
            device("3", "Apple TV", DeviceKind::Other, 0.0, "com.apple.CoreSimulator.SimRuntime.tvOS-18-0"),
        ];
        let snapshot = FleetSnapshot::build(devices, &BTreeSet::new());
        let keys: Vec<_> = snapshot.groups.iter().map(|g| g.display_name.as_str()).collect();
        assert_eq!(keys, ["iOS 18.0", "iOS 17.5", "tvOS-18-0"]);
        assert_eq!(snapshot.devices[0].name, "iPhone 16");
        assert_eq!(snapshot.devices[2].name, "Apple TV");
    }

    #[test]
    fn installed_runtimes_without_devices_get_empty_groups() {
        let installed: BTreeSet<String> = [IOS_17.to_owned(), IOS_18.to_owned()].into();
        let devices = vec![device("1", "iPhone 16", DeviceKind::Phone, 6.1, IOS_18)];
        let snapshot = FleetSnapshot::build(devices, &installed);
        assert_eq!(snapshot.groups.len(), 2);
        assert_eq!(snapshot.groups[1].runtime_key, IOS_17);
        assert!(snapshot.groups[1].devices.is_empty());
    }

    #[test]
    fn diff_is_idempotent() {
        let devices = vec![
            device("1", "iPhone 16", DeviceKind::Phone, 6.1, IOS_18),
            device("2", "iPad Air", DeviceKind::Tablet, 11.0, IOS_18),
        ];
        assert!(!has_meaningful_change(&devices, &devices.clone()));
    }

    #[test]
    fn diff_detects_state_name_runtime_and_membership() {
        let old = vec![device("1", "iPhone 16", DeviceKind::Phone, 6.1, IOS_18)];

        let mut booted = old.clone();
        booted[0].state = DeviceState::Booted;
        assert!(has_meaningful_change(&old, &booted));

        let mut renamed = old.clone();
        renamed[0].name = "Work phone".into();
        assert!(has_meaningful_change(&old, &renamed));

        let mut moved = old.clone();
        moved[0].runtime_key = IOS_17.into();
        assert!(has_meaningful_change(&old, &moved));

        let replaced = vec![device("9", "iPhone 16", DeviceKind::Phone, 6.1, IOS_18)];
        assert!(has_meaningful_change(&old, &replaced));
        assert!(has_meaningful_change(&old, &[]));
    }

    #[test]
    fn diff_ignores_metadata_only_changes() {
        let old = vec![device("1", "iPhone 16", DeviceKind::Phone, 6.1, IOS_18)];
        let mut resized = old.clone();
        resized[0].screen_size_inches = 6.3;
        assert!(!has_meaningful_change(&old, &resized));
    }

    #[test]
    fn enrichment_dedupes_and_classifies() {
        let lookup = MetadataLookup::bundled();
        let devices = enrich_devices(
            vec![
                raw("A", "iPhone 15", "Booted", IOS_17),
                raw("A", "iPhone 15", "Booted", IOS_17),
                raw("B", "iPad mini (A17 Pro)", "Shutdown", IOS_18),
                raw("C", "Apple Vision Pro", "Shutting Down", IOS_18),
            ],
            &lookup,
        );
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].kind, DeviceKind::Phone);
        assert_eq!(devices[0].physical_resolution, "1179*2556");
        assert!(devices[0].state.is_booted());
        assert_eq!(devices[1].kind, DeviceKind::Tablet);
        assert_eq!(devices[2].kind, DeviceKind::Other);
        assert!(devices[2].screen_size_inches.abs() < f64::EPSILON);
        assert_eq!(devices[2].state, DeviceState::Other("Shutting Down".into()));
    }

    #[test]
    fn with_states_patches_flat_list_and_groups() {
        let snapshot = FleetSnapshot::build(
            vec![device("1", "iPhone 16", DeviceKind::Phone, 6.1, IOS_18)],
            &BTreeSet::new(),
        );
        let id = DeviceId::from("1");
        let booted = DeviceState::Booted;
        let patched = snapshot.with_states(&HashMap::from([(&id, &booted)]));
        assert!(patched.devices[0].state.is_booted());
        assert!(patched.groups[0].devices[0].state.is_booted());
        assert!(!snapshot.devices[0].state.is_booted());
    }
}
