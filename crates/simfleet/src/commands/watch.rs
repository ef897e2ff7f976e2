//! `watch`: keep the monitor running and print every published change.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;

use simfleet_core::{Device, DeviceId, FleetMonitor, FleetSnapshot, MonitorConfig};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::devices::DeviceRow;

/// One printable line per device that appeared, vanished or changed state.
pub(crate) fn describe_changes(old: &FleetSnapshot, new: &FleetSnapshot, color: bool) -> Vec<String> {
    let before: HashMap<&DeviceId, &Device> = old.devices.iter().map(|d| (&d.id, d)).collect();
    let after: HashMap<&DeviceId, &Device> = new.devices.iter().map(|d| (&d.id, d)).collect();

    let mut lines = Vec::new();
    for d in &new.devices {
        match before.get(&d.id) {
            None => lines.push(format!(
                "+ {} ({}) {}",
                d.name,
                d.id,
                output::paint_state(&d.state, color)
            )),
            Some(prev) if prev.state != d.state => lines.push(format!(
                "~ {}: {} -> {}",
                d.name,
                output::paint_state(&prev.state, color),
                output::paint_state(&d.state, color)
            )),
            Some(_) => {}
        }
    }
    for d in &old.devices {
        if !after.contains_key(&d.id) {
            lines.push(format!("- {} ({})", d.name, d.id));
        }
    }
    lines
}

fn render_view(snapshot: &FleetSnapshot, global: &GlobalOpts, color: bool) -> String {
    match global.output {
        OutputFormat::Table => {
            let rows: Vec<DeviceRow> = snapshot.devices.iter().map(|d| DeviceRow::new(d, color)).collect();
            output::render_table(&rows)
        }
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_single(
            &OutputFormat::JsonCompact,
            snapshot,
            |_| String::new(),
            |_| String::new(),
        ),
        _ => output::render_single(&global.output, snapshot, |_| String::new(), |_| String::new()),
    }
}

pub async fn handle(ctx: &Context, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config: MonitorConfig = ctx.monitor.clone();
    if let Some(secs) = args.interval {
        config.poll_interval = Duration::from_secs(secs.max(1));
    }

    let monitor = FleetMonitor::new(config, Arc::clone(&ctx.control), Arc::clone(&ctx.metadata));
    let mut views = monitor.subscribe();
    let mut errors = monitor.errors().subscribe();
    monitor.start().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let structured = !matches!(global.output, OutputFormat::Table | OutputFormat::Plain);
    let mut shown: Option<Arc<FleetSnapshot>> = None;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = views.changed() => {
                let Some(view) = changed else { break };
                if !view.initial_load_completed {
                    continue;
                }
                match shown {
                    Some(ref prev) if Arc::ptr_eq(prev, &view.snapshot) => continue,
                    Some(ref prev) if !structured => {
                        let stamp = Local::now().format("%H:%M:%S");
                        for line in describe_changes(prev, &view.snapshot, ctx.color) {
                            output::print_output(&format!("{stamp}  {line}"), global.quiet);
                        }
                    }
                    _ => output::print_output(
                        &render_view(&view.snapshot, global, ctx.color),
                        global.quiet,
                    ),
                }
                shown = Some(view.snapshot);
            }
            res = errors.changed() => {
                if res.is_err() {
                    break;
                }
                let notice = errors.borrow_and_update().clone();
                if let Some(notice) = notice {
                    eprintln!("error: {}", notice.message);
                }
            }
        }
    }

    monitor.stop().await;
    Ok(())
}
