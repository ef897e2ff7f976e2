// simfleet-core: Reconciling simulator fleet monitor between simfleet-api and consumers.

pub mod command;
pub mod config;
pub mod error;
pub mod error_channel;
pub mod metadata;
pub mod model;
pub mod monitor;
pub mod operations;
pub mod snapshot;
pub mod store;
pub mod stream;
mod timing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::MonitorConfig;
pub use error::{CoreError, ErrorKind};
pub use error_channel::{ErrorChannel, ErrorNotice};
pub use metadata::{DeviceMetadata, MetadataLookup, MetadataSource};
pub use monitor::{FleetMonitor, MonitorPhase, RefreshOutcome};
pub use operations::{CreateReport, DeleteReport, OperationHandle, RuntimeImageOutcome};
pub use snapshot::{DeviceGroup, FleetSnapshot, enrich_devices, has_meaningful_change};
pub use store::{FleetStore, FleetView};
pub use stream::{FleetStream, FleetWatchStream};

pub use model::{
    Device, DeviceId, DeviceKind, DeviceState, RUNTIME_PREFIX, extract_version,
    format_display_name,
};
