//! Device command handlers.

use tabled::Tabled;

use simfleet_core::{Command as CoreCommand, Device, DeviceGroup, DeviceId, format_display_name};

use crate::cli::{DeviceArg, GlobalOpts, ListArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(super) struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Resolution")]
    resolution: String,
    #[tabled(rename = "Runtime")]
    runtime: String,
    #[tabled(rename = "UDID")]
    udid: String,
}

impl DeviceRow {
    pub(super) fn new(d: &Device, color: bool) -> Self {
        Self {
            name: d.name.clone(),
            state: output::paint_state(&d.state, color),
            kind: d.kind.to_string(),
            size: format_size(d.screen_size_inches),
            resolution: if d.physical_resolution.is_empty() {
                "-".into()
            } else {
                d.physical_resolution.clone()
            },
            runtime: format_display_name(&d.runtime_key),
            udid: d.id.to_string(),
        }
    }
}

fn format_size(inches: f64) -> String {
    if inches > 0.0 {
        format!("{inches:.1}\"")
    } else {
        "-".into()
    }
}

fn detail(d: &Device, color: bool) -> String {
    let or_dash = |s: &str| if s.is_empty() { "-".to_owned() } else { s.to_owned() };
    [
        format!("UDID:       {}", d.id),
        format!("Name:       {}", d.name),
        format!("State:      {}", output::paint_state(&d.state, color)),
        format!("Runtime:    {}", format_display_name(&d.runtime_key)),
        format!("Kind:       {}", d.kind),
        format!("Type:       {}", d.device_type_id.as_deref().unwrap_or("-")),
        format!("Size:       {}", format_size(d.screen_size_inches)),
        format!("Resolution: {}", or_dash(&d.physical_resolution)),
        format!("Points:     {}", or_dash(&d.logical_resolution)),
        format!("Available:  {}", if d.is_available { "yes" } else { "no" }),
    ]
    .join("\n")
}

fn render_grouped(groups: &[DeviceGroup], color: bool) -> String {
    groups
        .iter()
        .map(|g| {
            let heading = output::paint_heading(&g.display_name, color);
            if g.devices.is_empty() {
                return format!("{heading}\n  (no devices)");
            }
            let rows: Vec<DeviceRow> = g.devices.iter().map(|d| DeviceRow::new(d, color)).collect();
            format!("{heading}\n{}", output::render_table(&rows))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(ctx: &Context, args: &ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = ctx.snapshot().await?;
    let runtime = args
        .runtime
        .as_deref()
        .map(|r| util::resolve_runtime(&snapshot, r))
        .transpose()?;

    let keep = |d: &Device| {
        runtime.as_ref().is_none_or(|key| &d.runtime_key == key)
            && (!args.booted || d.state.is_booted())
    };

    let out = if args.grouped {
        let groups: Vec<DeviceGroup> = snapshot
            .groups
            .iter()
            .filter(|g| runtime.as_ref().is_none_or(|key| &g.runtime_key == key))
            .map(|g| DeviceGroup {
                devices: g.devices.iter().filter(|d| keep(d)).cloned().collect(),
                ..g.clone()
            })
            .filter(|g| !(args.booted && g.devices.is_empty()))
            .collect();
        match global.output {
            OutputFormat::Table => render_grouped(&groups, ctx.color),
            _ => output::render_single(
                &global.output,
                &groups,
                |_| String::new(),
                |gs| {
                    gs.iter()
                        .map(|g| g.runtime_key.as_str())
                        .collect::<Vec<_>>()
                        .join("\n")
                },
            ),
        }
    } else {
        let devices: Vec<Device> = snapshot.devices.iter().filter(|d| keep(d)).cloned().collect();
        output::render_list(
            &global.output,
            &devices,
            |d| DeviceRow::new(d, ctx.color),
            |d| d.id.to_string(),
        )
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn info(ctx: &Context, args: &DeviceArg, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = ctx.snapshot().await?;
    let device = util::resolve_device(&snapshot, &args.device)?;
    let out = output::render_single(
        &global.output,
        &device,
        |d| detail(d, ctx.color),
        Device::info_text,
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn boot(ctx: &Context, args: &DeviceArg, global: &GlobalOpts) -> Result<(), CliError> {
    power(ctx, args, global, true).await
}

pub async fn shutdown(ctx: &Context, args: &DeviceArg, global: &GlobalOpts) -> Result<(), CliError> {
    power(ctx, args, global, false).await
}

async fn power(
    ctx: &Context,
    args: &DeviceArg,
    global: &GlobalOpts,
    boot: bool,
) -> Result<(), CliError> {
    let monitor = ctx.open(ctx.monitor.clone()).await?;
    let device = util::resolve_device(&monitor.snapshot(), &args.device)?;
    let id: DeviceId = device.id.clone();

    let verb = if boot { "Booting" } else { "Shutting down" };
    let bar = util::spinner(format!("{verb} {}", device.name), global.quiet);
    let cmd = if boot {
        CoreCommand::Boot { id: id.clone() }
    } else {
        CoreCommand::Shutdown { id: id.clone() }
    };
    let result = monitor.execute(cmd).await;
    bar.finish_and_clear();
    let updated = monitor.device(&id);
    monitor.stop().await;
    result?;

    let device = updated.unwrap_or(device);
    let out = output::render_single(
        &global.output,
        &device,
        |d| format!("{}: {}", d.name, output::paint_state(&d.state, ctx.color)),
        |d| d.state.as_str().to_owned(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
