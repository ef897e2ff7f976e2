// simctl client
//
// Every operation is one `xcrun simctl ...` invocation. List calls pass
// `-j` and decode stdout; mutations only check the exit status.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{
    DeviceListResponse, DeviceTypeListResponse, DeviceTypeRecord, RawDeviceEntry, RuntimeImage,
    RuntimeListResponse, RuntimeRecord, ScreenProfile,
};
use crate::control::DeviceControl;
use crate::error::Error;
use crate::transport::{self, ToolConfig};

/// Relative location of the geometry descriptor inside a `.simdevicetype` bundle.
const PROFILE_PLIST: &str = "Contents/Resources/profile.plist";

/// Subprocess client for `xcrun simctl`.
///
/// Cheaply cloneable; holds only the tool configuration.
#[derive(Debug, Clone)]
pub struct SimctlClient {
    config: Arc<ToolConfig>,
}

impl SimctlClient {
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Run `xcrun simctl <args>` and return stdout.
    async fn simctl(&self, args: &[&str]) -> Result<Vec<u8>, Error> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("simctl");
        full.extend_from_slice(args);
        transport::run(&self.config.xcrun, &full, self.config.timeout).await
    }

    /// Run `xcrun simctl <args>` and decode stdout as JSON.
    async fn simctl_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, Error> {
        let body = self.simctl(args).await?;
        let mut full = vec!["simctl"];
        full.extend_from_slice(args);
        transport::parse_json(
            &transport::command_line(&self.config.xcrun, &full),
            &body,
        )
    }

    /// Shell command the user can run by hand when the elevation prompt fails.
    fn manual_runtime_delete(&self, image: &Uuid) -> String {
        format!(
            "sudo {} simctl runtime delete {image}",
            self.config.xcrun.display()
        )
    }
}

#[async_trait]
impl DeviceControl for SimctlClient {
    async fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, Error> {
        let resp: DeviceListResponse = self.simctl_json(&["list", "devices", "-j"]).await?;
        let entries = resp.into_entries();
        debug!(count = entries.len(), "listed devices");
        Ok(entries)
    }

    async fn list_runtimes(&self) -> Result<Vec<RuntimeRecord>, Error> {
        let resp: RuntimeListResponse = self.simctl_json(&["list", "runtimes", "-j"]).await?;
        Ok(resp.runtimes)
    }

    async fn list_device_types(&self) -> Result<Vec<DeviceTypeRecord>, Error> {
        let resp: DeviceTypeListResponse =
            self.simctl_json(&["list", "devicetypes", "-j"]).await?;
        Ok(resp.devicetypes)
    }

    async fn list_runtime_images(&self) -> Result<Vec<RuntimeImage>, Error> {
        let map: IndexMap<String, RuntimeImage> =
            self.simctl_json(&["runtime", "list", "-j"]).await?;
        Ok(map.into_values().collect())
    }

    async fn read_screen_profile(&self, bundle_path: &str) -> Result<ScreenProfile, Error> {
        let plist: PathBuf = [bundle_path, PROFILE_PLIST].iter().collect();
        let plist = plist.to_string_lossy();
        let args = ["-convert", "json", "-o", "-", &*plist];
        let body = transport::run(&self.config.plutil, &args, self.config.timeout).await?;
        transport::parse_json(&transport::command_line(&self.config.plutil, &args), &body)
    }

    async fn boot(&self, udid: &str) -> Result<(), Error> {
        self.simctl(&["boot", udid]).await?;
        info!(udid, "boot issued");
        Ok(())
    }

    async fn shutdown(&self, udid: &str) -> Result<(), Error> {
        self.simctl(&["shutdown", udid]).await?;
        info!(udid, "shutdown issued");
        Ok(())
    }

    async fn create(
        &self,
        name: &str,
        device_type_id: &str,
        runtime_key: &str,
    ) -> Result<String, Error> {
        let out = self
            .simctl(&["create", name, device_type_id, runtime_key])
            .await?;
        let udid = String::from_utf8_lossy(&out).trim().to_owned();
        info!(name, %udid, "device created");
        Ok(udid)
    }

    async fn delete(&self, udid: &str) -> Result<(), Error> {
        self.simctl(&["delete", udid]).await?;
        info!(udid, "device deleted");
        Ok(())
    }

    async fn delete_runtime_image(&self, image: &Uuid) -> Result<(), Error> {
        let xcrun = self
            .config
            .xcrun
            .display()
            .to_string()
            .replace('\\', "\\\\")
            .replace('"', "\\\"");
        let script = format!(
            "do shell script \"'{xcrun}' simctl runtime delete {image}\" with administrator privileges"
        );
        transport::run(&self.config.osascript, &["-e", &script], self.config.timeout)
            .await
            .map_err(|e| Error::Privileged {
                message: e.to_string(),
                fallback: self.manual_runtime_delete(image),
            })?;
        info!(%image, "runtime image deletion requested");
        Ok(())
    }

    async fn prune_unavailable(&self) -> Result<(), Error> {
        self.simctl(&["delete", "unavailable"]).await?;
        info!("pruned unavailable devices");
        Ok(())
    }

    async fn open_simulator_app(&self) -> Result<(), Error> {
        transport::run(&self.config.open, &["-a", "Simulator"], self.config.timeout).await?;
        Ok(())
    }
}
