//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod runtimes;
pub mod util;
pub mod watch;

use std::sync::Arc;

use simfleet_api::{DeviceControl, SimctlClient, ToolConfig};
use simfleet_core::{FleetMonitor, MetadataLookup, MonitorConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Everything a handler needs to talk to the fleet.
pub struct Context {
    pub monitor: MonitorConfig,
    pub control: Arc<dyn DeviceControl>,
    pub metadata: Arc<MetadataLookup>,
    pub color: bool,
}

impl Context {
    pub fn new(
        tool: ToolConfig,
        monitor: MonitorConfig,
        metadata: MetadataLookup,
        color: bool,
    ) -> Self {
        Self {
            monitor,
            control: Arc::new(SimctlClient::new(tool)),
            metadata: Arc::new(metadata),
            color,
        }
    }

    /// Snapshot-only access: one refresh, no timer.
    pub async fn snapshot(&self) -> Result<Arc<simfleet_core::FleetSnapshot>, CliError> {
        let snapshot = FleetMonitor::oneshot(
            self.monitor.clone(),
            Arc::clone(&self.control),
            Arc::clone(&self.metadata),
            |monitor| async move { Ok(monitor.snapshot()) },
        )
        .await?;
        Ok(snapshot)
    }

    /// A refreshed monitor for commands that mutate the fleet. The caller
    /// stops it when done.
    pub async fn open(&self, config: MonitorConfig) -> Result<FleetMonitor, CliError> {
        let monitor = FleetMonitor::new(
            MonitorConfig {
                poll_interval: std::time::Duration::ZERO,
                ..config
            },
            Arc::clone(&self.control),
            Arc::clone(&self.metadata),
        );
        if monitor.config().probe_device_types {
            if let Err(e) = monitor.metadata().refresh(&*self.control).await {
                tracing::warn!(error = %e, "device metadata probe failed");
            }
        }
        monitor.refresh().await?;
        Ok(monitor)
    }
}

/// Dispatch a fleet-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::List(args) => devices::list(ctx, &args, global).await,
        Command::Info(args) => devices::info(ctx, &args, global).await,
        Command::Boot(args) => devices::boot(ctx, &args, global).await,
        Command::Shutdown(args) => devices::shutdown(ctx, &args, global).await,
        Command::Watch(args) => watch::handle(ctx, &args, global).await,
        Command::Runtimes => runtimes::list(ctx, global).await,
        Command::CreateDefaults(args) => runtimes::create_defaults(ctx, &args, global).await,
        Command::DeleteRuntime(args) => runtimes::delete(ctx, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need the fleet".into(),
        )),
    }
}
