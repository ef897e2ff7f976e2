// ── simctl wire records ──
//
// Typed shapes for the JSON emitted by `simctl list ... -j`,
// `simctl runtime list -j` and `plutil -convert json` on a device-type
// profile. Every field the tool may omit is optional.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `simctl list devices -j`: runtime key -> devices on that runtime.
#[derive(Debug, Deserialize)]
pub(crate) struct DeviceListResponse {
    pub devices: IndexMap<String, Vec<RawDevice>>,
}

/// A single simulator as listed by simctl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    pub udid: String,
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub device_type_identifier: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub availability_error: Option<String>,
    #[serde(default)]
    pub last_booted_at: Option<String>,
}

/// A device together with the runtime key it was listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeviceEntry {
    pub runtime_key: String,
    pub device: RawDevice,
}

/// `simctl list runtimes -j`.
#[derive(Debug, Deserialize)]
pub(crate) struct RuntimeListResponse {
    pub runtimes: Vec<RuntimeRecord>,
}

/// An installed OS runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeRecord {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "buildversion")]
    pub build_version: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub supported_device_types: Vec<DeviceTypeRecord>,
}

/// `simctl list devicetypes -j`.
#[derive(Debug, Deserialize)]
pub(crate) struct DeviceTypeListResponse {
    pub devicetypes: Vec<DeviceTypeRecord>,
}

/// A creatable device type (e.g. `com.apple.CoreSimulator.SimDeviceType.iPhone-15`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTypeRecord {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub product_family: Option<String>,
    #[serde(default)]
    pub bundle_path: Option<String>,
    #[serde(default)]
    pub model_identifier: Option<String>,
}

/// A disk image backing a runtime, from `simctl runtime list -j`.
///
/// The listing is keyed by the image UUID; `identifier` repeats it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeImage {
    pub identifier: Uuid,
    #[serde(default)]
    pub runtime_identifier: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub deletable: Option<bool>,
}

/// Display geometry declared by a device type's `profile.plist`.
///
/// Values are kept as floats since plist numbers may be integer or real.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenProfile {
    #[serde(default, rename = "mainScreenWidth")]
    pub width_px: Option<f64>,
    #[serde(default, rename = "mainScreenHeight")]
    pub height_px: Option<f64>,
    #[serde(default, rename = "mainScreenScale")]
    pub scale: Option<f64>,
    #[serde(default, rename = "mainScreenWidthDPI")]
    pub width_dpi: Option<f64>,
    #[serde(default, rename = "mainScreenHeightDPI")]
    pub height_dpi: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl DeviceListResponse {
    /// Flatten the runtime map, keeping the tool's ordering.
    pub(crate) fn into_entries(self) -> Vec<RawDeviceEntry> {
        self.devices
            .into_iter()
            .flat_map(|(runtime_key, devices)| {
                devices.into_iter().map(move |device| RawDeviceEntry {
                    runtime_key: runtime_key.clone(),
                    device,
                })
            })
            .collect()
    }
}
