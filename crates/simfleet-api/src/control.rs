// ── Device-control seam ──
//
// The reconciler talks to the simulator host only through this trait,
// so tests can substitute an in-memory fleet for the real tool.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;
use crate::simctl::models::{
    DeviceTypeRecord, RawDeviceEntry, RuntimeImage, RuntimeRecord, ScreenProfile,
};

/// Operations offered by the external device-control tool.
///
/// Implementations never retry; retry policy belongs to the caller.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Every device on the host, tagged with its runtime key.
    async fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, Error>;

    /// Installed runtimes.
    async fn list_runtimes(&self) -> Result<Vec<RuntimeRecord>, Error>;

    /// Every device type the tool knows about.
    async fn list_device_types(&self) -> Result<Vec<DeviceTypeRecord>, Error>;

    /// Device types a given runtime can host.
    async fn list_supported_device_types(
        &self,
        runtime_key: &str,
    ) -> Result<Vec<DeviceTypeRecord>, Error> {
        self.list_runtimes()
            .await?
            .into_iter()
            .find(|rt| rt.identifier == runtime_key)
            .map(|rt| rt.supported_device_types)
            .ok_or_else(|| Error::RuntimeNotFound {
                runtime_key: runtime_key.to_owned(),
            })
    }

    /// Runtime disk images, used to resolve the UUID for a privileged delete.
    async fn list_runtime_images(&self) -> Result<Vec<RuntimeImage>, Error>;

    /// Screen geometry declared by a device-type bundle.
    async fn read_screen_profile(&self, bundle_path: &str) -> Result<ScreenProfile, Error>;

    async fn boot(&self, udid: &str) -> Result<(), Error>;

    async fn shutdown(&self, udid: &str) -> Result<(), Error>;

    /// Create a device and return its UDID.
    async fn create(
        &self,
        name: &str,
        device_type_id: &str,
        runtime_key: &str,
    ) -> Result<String, Error>;

    async fn delete(&self, udid: &str) -> Result<(), Error>;

    /// Delete a runtime image. Requires elevation and has no programmatic
    /// confirmation beyond the absence of an error.
    async fn delete_runtime_image(&self, image: &Uuid) -> Result<(), Error>;

    /// Remove devices whose runtime is no longer available.
    async fn prune_unavailable(&self) -> Result<(), Error>;

    /// Bring the Simulator app to the foreground.
    async fn open_simulator_app(&self) -> Result<(), Error>;
}
