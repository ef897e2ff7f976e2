//! In-memory `DeviceControl` used by the monitor and operation tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use simfleet_api::{
    DeviceControl, DeviceTypeRecord, Error, RawDevice, RawDeviceEntry, RuntimeImage,
    RuntimeRecord, ScreenProfile,
};
use simfleet_core::{FleetMonitor, MetadataLookup, MonitorConfig};
use uuid::Uuid;

pub const IOS_17: &str = "com.apple.CoreSimulator.SimRuntime.iOS-17-5";
pub const IOS_18: &str = "com.apple.CoreSimulator.SimRuntime.iOS-18-0";

pub fn raw(udid: &str, name: &str, state: &str, runtime: &str) -> RawDeviceEntry {
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

pub fn device_type(name: &str, family: &str) -> DeviceTypeRecord {
    DeviceTypeRecord {
        identifier: format!("com.apple.CoreSimulator.SimDeviceType.{}", name.replace(' ', "-")),
        name: name.into(),
        product_family: Some(family.into()),
        bundle_path: None,
        model_identifier: None,
    }
}

fn failure(command: String) -> Error {
    Error::ExecutionFailed {
        command,
        code: 1,
        stderr: "simulated failure".into(),
    }
}

/// Scripted fleet. Mutations apply to `devices` unless told to fail.
#[derive(Default)]
pub struct FakeControl {
    pub devices: Mutex<Vec<RawDeviceEntry>>,
    pub runtimes: Mutex<Vec<RuntimeRecord>>,
    pub images: Mutex<Vec<RuntimeImage>>,
    pub device_types: Mutex<Vec<DeviceTypeRecord>>,
    /// Screen profiles by bundle path.
    pub profiles: Mutex<HashMap<String, ScreenProfile>>,
    /// Every mutating call, e.g. `"boot A"`.
    pub calls: Mutex<Vec<String>>,
    pub list_calls: AtomicUsize,
    pub fail_list: AtomicBool,
    /// `list_devices` never returns.
    pub hang_list: AtomicBool,
    pub fail_boot: AtomicBool,
    pub fail_shutdown: AtomicBool,
    pub fail_create: Mutex<HashSet<String>>,
    pub deny_elevation: AtomicBool,
    next_udid: AtomicUsize,
}

impl FakeControl {
    pub fn with_devices(devices: Vec<RawDeviceEntry>) -> Arc<Self> {
        Arc::new(Self {
            devices: Mutex::new(devices),
            ..Self::default()
        })
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn set_state(&self, udid: &str, state: &str) {
        for entry in self.devices.lock().unwrap().iter_mut() {
            if entry.device.udid == udid {
                entry.device.state = state.into();
            }
        }
    }
}

#[async_trait]
impl DeviceControl for FakeControl {
    async fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, Error> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_list.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(failure("xcrun simctl list devices -j".into()));
        }
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn list_runtimes(&self) -> Result<Vec<RuntimeRecord>, Error> {
        Ok(self.runtimes.lock().unwrap().clone())
    }

    async fn list_device_types(&self) -> Result<Vec<DeviceTypeRecord>, Error> {
        Ok(self.device_types.lock().unwrap().clone())
    }

    async fn list_runtime_images(&self) -> Result<Vec<RuntimeImage>, Error> {
        Ok(self.images.lock().unwrap().clone())
    }

    async fn read_screen_profile(&self, bundle_path: &str) -> Result<ScreenProfile, Error> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .get(bundle_path)
            .cloned()
            .unwrap_or_default())
    }

    async fn boot(&self, udid: &str) -> Result<(), Error> {
        self.record(format!("boot {udid}"));
        if self.fail_boot.load(Ordering::SeqCst) {
            return Err(failure(format!("xcrun simctl boot {udid}")));
        }
        self.set_state(udid, "Booted");
        Ok(())
    }

    async fn shutdown(&self, udid: &str) -> Result<(), Error> {
        self.record(format!("shutdown {udid}"));
        if self.fail_shutdown.load(Ordering::SeqCst) {
            return Err(failure(format!("xcrun simctl shutdown {udid}")));
        }
        self.set_state(udid, "Shutdown");
        Ok(())
    }

    async fn create(
        &self,
        name: &str,
        _device_type_id: &str,
        runtime_key: &str,
    ) -> Result<String, Error> {
        self.record(format!("create {name}"));
        if self.fail_create.lock().unwrap().contains(name) {
            return Err(failure(format!("xcrun simctl create {name}")));
        }
        let udid = format!("NEW-{}", self.next_udid.fetch_add(1, Ordering::SeqCst));
        self.devices
            .lock()
            .unwrap()
            .push(raw(&udid, name, "Shutdown", runtime_key));
        Ok(udid)
    }

    async fn delete(&self, udid: &str) -> Result<(), Error> {
        self.record(format!("delete {udid}"));
        self.devices.lock().unwrap().retain(|e| e.device.udid != udid);
        Ok(())
    }

    async fn delete_runtime_image(&self, image: &Uuid) -> Result<(), Error> {
        self.record(format!("delete image {image}"));
        if self.deny_elevation.load(Ordering::SeqCst) {
            return Err(Error::Privileged {
                message: "User canceled".into(),
                fallback: format!("sudo xcrun simctl runtime delete {image}"),
            });
        }
        Ok(())
    }

    async fn prune_unavailable(&self) -> Result<(), Error> {
        self.record("delete unavailable".into());
        Ok(())
    }

    async fn open_simulator_app(&self) -> Result<(), Error> {
        self.record("open Simulator".into());
        Ok(())
    }
}

/// Quiet config: no pruning, probing or app launching.
pub fn test_config() -> MonitorConfig {
    MonitorConfig {
        prune_on_start: false,
        probe_device_types: false,
        open_simulator_on_boot: false,
        ..MonitorConfig::default()
    }
}

pub fn monitor(fake: &Arc<FakeControl>, config: MonitorConfig) -> FleetMonitor {
    let control: Arc<dyn DeviceControl> = fake.clone();
    FleetMonitor::new(config, control, Arc::new(MetadataLookup::bundled()))
}
