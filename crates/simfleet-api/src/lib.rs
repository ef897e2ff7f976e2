// simfleet-api: Async subprocess client for the `xcrun simctl` device-control tool.

pub mod control;
pub mod error;
pub mod simctl;
pub mod transport;

pub use control::DeviceControl;
pub use error::{Error, ErrorKind};
pub use simctl::SimctlClient;
pub use simctl::models::{
    DeviceTypeRecord, RawDevice, RawDeviceEntry, RuntimeImage, RuntimeRecord, ScreenProfile,
};
pub use transport::ToolConfig;
