// ── Fleet operations ──
//
// User commands as multi-step sequences. Power operations patch the
// published view first and confirm through a forced refresh once the
// settle delay has passed; bulk operations run inline and report counts.

use std::collections::HashSet;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::model::{DeviceId, DeviceKind, DeviceState};
use crate::monitor::FleetMonitor;

// ── Handles & reports ────────────────────────────────────────────

/// A power operation running in the background.
#[derive(Debug)]
pub struct OperationHandle {
    device: DeviceId,
    task: JoinHandle<Result<(), CoreError>>,
}

impl OperationHandle {
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the tool call, settle delay and confirmation refresh.
    pub async fn wait(self) -> Result<(), CoreError> {
        self.task
            .await
            .map_err(|e| CoreError::Internal(format!("operation task failed: {e}")))?
    }
}

/// Outcome of the privileged runtime-image step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuntimeImageOutcome {
    #[default]
    NotRequested,
    /// The elevated delete ran without error. The tool gives no further
    /// confirmation.
    Requested { image: String },
    /// No runtime image is registered for the key.
    NotFound,
    Failed { message: String, fallback: Option<String> },
}

/// Result of deleting every device on a runtime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub runtime_key: String,
    pub deleted: usize,
    pub failed: usize,
    pub runtime_image: RuntimeImageOutcome,
}

/// Result of creating the default phone/tablet set for a runtime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateReport {
    pub runtime_key: String,
    pub created: Vec<DeviceId>,
    /// Supported types skipped because a device with that name exists.
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerAction {
    Boot,
    Shutdown,
}

impl PowerAction {
    fn target(self) -> DeviceState {
        match self {
            Self::Boot => DeviceState::Booted,
            Self::Shutdown => DeviceState::Shutdown,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Shutdown => "shutdown",
        }
    }
}

impl FleetMonitor {
    // ── Power ────────────────────────────────────────────────────

    /// Boot a device. The published view shows it as `Booted` on return.
    pub fn boot(&self, id: &DeviceId) -> Result<OperationHandle, CoreError> {
        self.power(id, PowerAction::Boot)
    }

    /// Shut a device down. The published view shows it as `Shutdown` on return.
    pub fn shutdown(&self, id: &DeviceId) -> Result<OperationHandle, CoreError> {
        self.power(id, PowerAction::Shutdown)
    }

    fn power(&self, id: &DeviceId, action: PowerAction) -> Result<OperationHandle, CoreError> {
        if self.snapshot().device(id).is_none() {
            return Err(CoreError::DeviceNotFound {
                identifier: id.to_string(),
            });
        }

        let guard = self.operating_guard();
        let patch = self.inner.store.apply_patch(id.clone(), action.target());
        info!(device = %id, action = action.label(), "optimistic state applied");

        let monitor = self.clone();
        let device = id.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            let config = &monitor.inner.config;

            let result = {
                let _timer = monitor.timer(action.label());
                let udid = device.as_str();
                let outcome = match action {
                    PowerAction::Boot => monitor.inner.control.boot(udid).await,
                    PowerAction::Shutdown => monitor.inner.control.shutdown(udid).await,
                };
                outcome.map_err(CoreError::from)
            };
            if let Err(ref e) = result {
                monitor.inner.errors.report(e);
            }

            let settle = match action {
                PowerAction::Boot => config.boot_settle,
                PowerAction::Shutdown => config.shutdown_settle,
            };
            tokio::time::sleep(settle).await;

            if action == PowerAction::Boot && result.is_ok() && config.open_simulator_on_boot {
                if let Err(e) = monitor.inner.control.open_simulator_app().await {
                    warn!(error = %e, "could not open the Simulator app");
                }
            }

            monitor.inner.store.settle_patch(patch);
            if let Err(e) = monitor.force_refresh().await {
                warn!(device = %device, error = %e, "confirmation refresh failed");
            }
            result
        });

        Ok(OperationHandle {
            device: id.clone(),
            task,
        })
    }

    // ── Bulk delete ──────────────────────────────────────────────

    /// Delete every device on `runtime_key`, shutting booted ones down
    /// first, and optionally the runtime image itself.
    pub async fn delete_devices_for_runtime(
        &self,
        runtime_key: &str,
        also_delete_runtime_image: bool,
    ) -> Result<DeleteReport, CoreError> {
        let snapshot = self.snapshot();
        let group = snapshot.group(runtime_key);
        if group.is_none() && !also_delete_runtime_image {
            return Err(CoreError::RuntimeNotFound {
                runtime_key: runtime_key.to_owned(),
            });
        }
        let devices = group.map(|g| g.devices.clone()).unwrap_or_default();

        let _guard = self.operating_guard();
        let _timer = self.timer("delete_runtime");
        let control = &self.inner.control;
        let mut report = DeleteReport {
            runtime_key: runtime_key.to_owned(),
            ..DeleteReport::default()
        };

        for device in devices {
            let udid = device.id.as_str();
            if device.state.is_booted() {
                if let Err(e) = control.shutdown(udid).await {
                    warn!(device = udid, error = %e, "shutdown before delete failed");
                    self.inner.errors.report(&CoreError::from(e));
                }
                tokio::time::sleep(self.inner.config.delete_settle).await;
            }
            match control.delete(udid).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    report.failed += 1;
                    self.inner.errors.report(&CoreError::from(e));
                }
            }
        }

        if also_delete_runtime_image {
            report.runtime_image = self.delete_runtime_image(runtime_key).await;
        }

        info!(
            runtime = runtime_key,
            deleted = report.deleted,
            failed = report.failed,
            "runtime devices deleted"
        );
        if let Err(e) = self.force_refresh().await {
            warn!(error = %e, "refresh after delete failed");
        }
        Ok(report)
    }

    async fn delete_runtime_image(&self, runtime_key: &str) -> RuntimeImageOutcome {
        let control = &self.inner.control;
        let images = match control.list_runtime_images().await {
            Ok(images) => images,
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.errors.report(&err);
                return RuntimeImageOutcome::Failed {
                    message: err.to_string(),
                    fallback: None,
                };
            }
        };

        let Some(image) = images
            .into_iter()
            .find(|img| img.runtime_identifier.as_deref() == Some(runtime_key))
        else {
            return RuntimeImageOutcome::NotFound;
        };

        match control.delete_runtime_image(&image.identifier).await {
            Ok(()) => RuntimeImageOutcome::Requested {
                image: image.identifier.to_string(),
            },
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.errors.report(&err);
                match err {
                    CoreError::PrivilegedOperationFailed { message, fallback } => {
                        RuntimeImageOutcome::Failed {
                            message,
                            fallback: Some(fallback),
                        }
                    }
                    other => RuntimeImageOutcome::Failed {
                        message: other.to_string(),
                        fallback: None,
                    },
                }
            }
        }
    }

    // ── Default devices ──────────────────────────────────────────

    /// Create one device per supported phone/tablet type not already
    /// present (by name) on `runtime_key`.
    pub async fn create_default_devices(&self, runtime_key: &str) -> Result<CreateReport, CoreError> {
        let _guard = self.operating_guard();
        let _timer = self.timer("create_defaults");
        let control = &self.inner.control;

        let types = control
            .list_supported_device_types(runtime_key)
            .await
            .map_err(CoreError::from)
            .inspect_err(|e| self.inner.errors.report(e))?;

        let existing: HashSet<String> = self
            .snapshot()
            .group(runtime_key)
            .map(|g| g.devices.iter().map(|d| d.name.clone()).collect())
            .unwrap_or_default();

        let mut report = CreateReport {
            runtime_key: runtime_key.to_owned(),
            ..CreateReport::default()
        };
        for ty in types {
            let kind = ty
                .product_family
                .as_deref()
                .and_then(DeviceKind::from_family)
                .unwrap_or_else(|| DeviceKind::from_name(&ty.name));
            if !kind.is_handheld() {
                continue;
            }
            if existing.contains(&ty.name) {
                report.skipped += 1;
                continue;
            }
            match control.create(&ty.name, &ty.identifier, runtime_key).await {
                Ok(udid) => report.created.push(DeviceId::from(udid)),
                Err(e) => {
                    report.failed += 1;
                    self.inner.errors.report(&CoreError::from(e));
                }
            }
        }

        info!(
            runtime = runtime_key,
            created = report.created.len(),
            skipped = report.skipped,
            failed = report.failed,
            "default devices created"
        );
        if let Err(e) = self.force_refresh().await {
            warn!(error = %e, "refresh after create failed");
        }
        Ok(report)
    }
}
