//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use simfleet_core::{Device, FleetSnapshot, RUNTIME_PREFIX};

use crate::error::CliError;

/// Resolve a device by UDID, then by exact name (which must be unique).
pub fn resolve_device(snapshot: &FleetSnapshot, identifier: &str) -> Result<Device, CliError> {
    if let Some(device) = snapshot
        .devices
        .iter()
        .find(|d| d.id.as_str().eq_ignore_ascii_case(identifier))
    {
        return Ok(device.clone());
    }

    let named: Vec<&Device> = snapshot
        .devices
        .iter()
        .filter(|d| d.name == identifier)
        .collect();
    match named.as_slice() {
        [device] => Ok((*device).clone()),
        [] => Err(CliError::NotFound {
            resource_type: "device".into(),
            identifier: identifier.into(),
            list_command: "list".into(),
        }),
        many => Err(CliError::Ambiguous {
            resource_type: "device".into(),
            identifier: identifier.into(),
            candidates: many
                .iter()
                .map(|d| d.id.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Resolve a runtime by full key, key suffix (`iOS-18-0`) or display name.
///
/// A full key that matches no group is passed through so the caller can
/// still act on runtimes without devices.
pub fn resolve_runtime(snapshot: &FleetSnapshot, identifier: &str) -> Result<String, CliError> {
    let suffix = format!("{RUNTIME_PREFIX}{identifier}");
    let found = snapshot.groups.iter().find(|g| {
        g.runtime_key == identifier
            || g.runtime_key == suffix
            || g.display_name.eq_ignore_ascii_case(identifier)
    });
    match found {
        Some(group) => Ok(group.runtime_key.clone()),
        None if identifier.starts_with(RUNTIME_PREFIX) => Ok(identifier.to_owned()),
        None => Err(CliError::NotFound {
            resource_type: "runtime".into(),
            identifier: identifier.into(),
            list_command: "runtimes --all-runtimes".into(),
        }),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Stderr spinner for long-running operations. Hidden in quiet mode and
/// when stderr is not a terminal.
pub fn spinner(message: impl Into<String>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use simfleet_core::{DeviceId, DeviceKind, DeviceState};

    use super::*;

    const IOS_18: &str = "com.apple.CoreSimulator.SimRuntime.iOS-18-0";

    fn device(id: &str, name: &str) -> Device {
        Device {
            id: DeviceId::from(id),
            name: name.into(),
            state: DeviceState::Shutdown,
            runtime_key: IOS_18.into(),
            device_type_id: None,
            kind: DeviceKind::Phone,
            screen_size_inches: 6.1,
            physical_resolution: String::new(),
            logical_resolution: String::new(),
            is_available: true,
        }
    }

    fn fleet() -> FleetSnapshot {
        FleetSnapshot::build(
            vec![
                device("AAAA", "iPhone 16"),
                device("BBBB", "iPhone 16 Pro"),
                device("CCCC", "iPhone 16 Pro"),
            ],
            &BTreeSet::new(),
        )
    }

    #[test]
    fn device_by_udid_or_unique_name() {
        let snap = fleet();
        assert_eq!(resolve_device(&snap, "aaaa").map(|d| d.name).ok().as_deref(), Some("iPhone 16"));
        assert_eq!(
            resolve_device(&snap, "iPhone 16").map(|d| d.id.to_string()).ok().as_deref(),
            Some("AAAA")
        );
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let err = resolve_device(&fleet(), "iPhone 16 Pro").err();
        assert!(matches!(err, Some(CliError::Ambiguous { .. })));
    }

    #[test]
    fn runtime_by_suffix_or_display_name() {
        let snap = fleet();
        assert_eq!(resolve_runtime(&snap, "iOS-18-0").ok().as_deref(), Some(IOS_18));
        assert_eq!(resolve_runtime(&snap, "ios 18.0").ok().as_deref(), Some(IOS_18));
        assert!(matches!(
            resolve_runtime(&snap, "iOS 9.3"),
            Err(CliError::NotFound { .. })
        ));

        let unknown = "com.apple.CoreSimulator.SimRuntime.iOS-9-3";
        assert_eq!(resolve_runtime(&snap, unknown).ok().as_deref(), Some(unknown));
    }
}
