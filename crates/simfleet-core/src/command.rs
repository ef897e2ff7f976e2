// ── Command API ──
//
// Every user-initiated write flows through a `Command`. The monitor
// routes each variant to the matching operation.

use crate::error::CoreError;
use crate::model::DeviceId;
use crate::monitor::{FleetMonitor, RefreshOutcome};
use crate::operations::{CreateReport, DeleteReport};

/// All user-initiated operations against the fleet.
#[derive(Debug, Clone)]
pub enum Command {
    Boot { id: DeviceId },
    Shutdown { id: DeviceId },
    CreateDefaults { runtime_key: String },
    DeleteRuntime { runtime_key: String, delete_image: bool },
    /// `manual` goes through the loading-flag path with its watchdog.
    Refresh { manual: bool },
}

/// What a completed command produced.
#[derive(Debug)]
pub enum CommandResult {
    /// A power operation finished, including its confirmation refresh.
    Ok,
    Refreshed(RefreshOutcome),
    Created(CreateReport),
    Deleted(DeleteReport),
}

impl FleetMonitor {
    /// Run a command to completion.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        match cmd {
            Command::Boot { id } => {
                self.boot(&id)?.wait().await?;
                Ok(CommandResult::Ok)
            }
            Command::Shutdown { id } => {
                self.shutdown(&id)?.wait().await?;
                Ok(CommandResult::Ok)
            }
            Command::CreateDefaults { runtime_key } => self
                .create_default_devices(&runtime_key)
                .await
                .map(CommandResult::Created),
            Command::DeleteRuntime {
                runtime_key,
                delete_image,
            } => self
                .delete_devices_for_runtime(&runtime_key, delete_image)
                .await
                .map(CommandResult::Deleted),
            Command::Refresh { manual: true } => {
                self.manual_refresh().await.map(CommandResult::Refreshed)
            }
            Command::Refresh { manual: false } => {
                self.force_refresh().await.map(CommandResult::Refreshed)
            }
        }
    }
}
