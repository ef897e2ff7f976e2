//! Runtime command handlers: listing and bulk device management.

use tabled::Tabled;

use simfleet_core::{
    Command as CoreCommand, CommandResult, CreateReport, DeleteReport, DeviceGroup, MonitorConfig,
    RuntimeImageOutcome, format_display_name,
};

use crate::cli::{DeleteRuntimeArgs, GlobalOpts, RuntimeArg};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RuntimeRow {
    #[tabled(rename = "Runtime")]
    name: String,
    #[tabled(rename = "Devices")]
    devices: usize,
    #[tabled(rename = "Booted")]
    booted: usize,
    #[tabled(rename = "Key")]
    key: String,
}

impl From<&DeviceGroup> for RuntimeRow {
    fn from(g: &DeviceGroup) -> Self {
        Self {
            name: g.display_name.clone(),
            devices: g.devices.len(),
            booted: g.devices.iter().filter(|d| d.state.is_booted()).count(),
            key: g.runtime_key.clone(),
        }
    }
}

fn create_detail(r: &CreateReport) -> String {
    let mut lines = vec![format!(
        "{}: created {}, skipped {}, failed {}",
        format_display_name(&r.runtime_key),
        r.created.len(),
        r.skipped,
        r.failed
    )];
    lines.extend(r.created.iter().map(|id| format!("  + {id}")));
    lines.join("\n")
}

fn delete_detail(r: &DeleteReport) -> String {
    let mut line = format!(
        "{}: deleted {}, failed {}",
        format_display_name(&r.runtime_key),
        r.deleted,
        r.failed
    );
    match r.runtime_image {
        RuntimeImageOutcome::NotRequested => {}
        RuntimeImageOutcome::Requested { ref image } => {
            line.push_str(&format!("\nRuntime image {image} deletion requested"));
        }
        RuntimeImageOutcome::NotFound => line.push_str("\nNo runtime image registered"),
        RuntimeImageOutcome::Failed { ref message, .. } => {
            line.push_str(&format!("\nRuntime image not deleted: {message}"));
        }
    }
    line
}

/// Bulk commands act on installed runtimes too, so seed every group.
fn bulk_config(ctx: &Context) -> MonitorConfig {
    MonitorConfig {
        show_all_runtimes: true,
        ..ctx.monitor.clone()
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = ctx.snapshot().await?;
    let out = output::render_list(
        &global.output,
        &snapshot.groups,
        |g| RuntimeRow::from(g),
        |g| g.runtime_key.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn create_defaults(
    ctx: &Context,
    args: &RuntimeArg,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let monitor = ctx.open(bulk_config(ctx)).await?;
    let runtime_key = util::resolve_runtime(&monitor.snapshot(), &args.runtime)?;

    let bar = util::spinner(
        format!("Creating devices for {}", format_display_name(&runtime_key)),
        global.quiet,
    );
    let result = monitor
        .execute(CoreCommand::CreateDefaults {
            runtime_key: runtime_key.clone(),
        })
        .await;
    bar.finish_and_clear();
    monitor.stop().await;

    let CommandResult::Created(report) = result? else {
        return Err(CliError::Internal("unexpected result for create".into()));
    };
    let out = output::render_single(&global.output, &report, create_detail, |r| {
        r.created
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn delete(
    ctx: &Context,
    args: &DeleteRuntimeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let monitor = ctx.open(bulk_config(ctx)).await?;
    let snapshot = monitor.snapshot();
    let runtime_key = util::resolve_runtime(&snapshot, &args.runtime)?;
    let count = snapshot.group(&runtime_key).map_or(0, |g| g.devices.len());

    let mut prompt = format!(
        "Delete {count} device(s) on {}",
        format_display_name(&runtime_key)
    );
    if args.image {
        prompt.push_str(" and the runtime image");
    }
    prompt.push('?');
    if !util::confirm(&prompt, "delete-runtime", global.yes)? {
        monitor.stop().await;
        return Err(CliError::Cancelled);
    }

    let bar = util::spinner(format!("Deleting {count} device(s)"), global.quiet);
    let result = monitor
        .execute(CoreCommand::DeleteRuntime {
            runtime_key,
            delete_image: args.image,
        })
        .await;
    bar.finish_and_clear();
    monitor.stop().await;

    let CommandResult::Deleted(report) = result? else {
        return Err(CliError::Internal("unexpected result for delete".into()));
    };
    let out = output::render_single(&global.output, &report, delete_detail, |r| {
        r.deleted.to_string()
    });
    output::print_output(&out, global.quiet);

    if let RuntimeImageOutcome::Failed {
        message,
        fallback: Some(fallback),
    } = report.runtime_image
    {
        return Err(CliError::Privileged { message, fallback });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use simfleet_core::DeviceId;

    use super::*;

    #[test]
    fn delete_detail_mentions_declined_image() {
        let report = DeleteReport {
            runtime_key: "com.apple.CoreSimulator.SimRuntime.iOS-17-5".into(),
            deleted: 2,
            failed: 0,
            runtime_image: RuntimeImageOutcome::Failed {
                message: "User canceled".into(),
                fallback: None,
            },
        };
        assert_eq!(
            delete_detail(&report),
            "iOS 17.5: deleted 2, failed 0\nRuntime image not deleted: User canceled"
        );
    }

    #[test]
    fn create_detail_lists_new_udids() {
        let report = CreateReport {
            runtime_key: "com.apple.CoreSimulator.SimRuntime.iOS-18-0".into(),
            created: vec![DeviceId::from("NEW-1")],
            skipped: 3,
            failed: 0,
        };
        assert_eq!(
            create_detail(&report),
            "iOS 18.0: created 1, skipped 3, failed 0\n  + NEW-1"
        );
    }
}
