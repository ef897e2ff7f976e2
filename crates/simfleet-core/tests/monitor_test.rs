//! Reconciler timing behaviour against an in-memory fleet, on paused time.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeControl, IOS_17, IOS_18, monitor, raw, test_config};
use pretty_assertions::assert_eq;
use simfleet_api::RuntimeRecord;
use simfleet_core::{DeviceId, DeviceState, ErrorKind, MonitorConfig, MonitorPhase, RefreshOutcome};
use tokio::time::sleep;

fn two_devices() -> std::sync::Arc<FakeControl> {
    FakeControl::with_devices(vec![
        raw("A", "iPhone 16", "Shutdown", IOS_18),
        raw("B", "iPad Air 11-inch (M2)", "Booted", IOS_17),
    ])
}

// ── Cache ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn refresh_within_cache_window_skips_tool() {
    let fake = two_devices();
    let monitor = monitor(&fake, test_config());

    assert_eq!(monitor.refresh().await.unwrap(), RefreshOutcome::Published);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(monitor.refresh().await.unwrap(), RefreshOutcome::Cached);
    assert_eq!(fake.list_calls(), 1);

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(monitor.refresh().await.unwrap(), RefreshOutcome::Unchanged);
    assert_eq!(fake.list_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn unchanged_fetch_restarts_cache_window() {
    let fake = two_devices();
    let monitor = monitor(&fake, test_config());

    assert_eq!(monitor.refresh().await.unwrap(), RefreshOutcome::Published);
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(monitor.refresh().await.unwrap(), RefreshOutcome::Unchanged);

    sleep(Duration::from_millis(500)).await;
    assert_eq!(monitor.refresh().await.unwrap(), RefreshOutcome::Cached);
    sleep(Duration::from_millis(500)).await;
    assert_eq!(monitor.refresh().await.unwrap(), RefreshOutcome::Cached);
    assert_eq!(fake.list_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn force_refresh_bypasses_cache() {
    let fake = two_devices();
    let monitor = monitor(&fake, test_config());

    monitor.refresh().await.unwrap();
    assert_eq!(monitor.force_refresh().await.unwrap(), RefreshOutcome::Published);
    assert_eq!(fake.list_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn unchanged_fetch_does_not_republish() {
    let fake = two_devices();
    let monitor = monitor(&fake, test_config());
    monitor.refresh().await.unwrap();

    let mut stream = monitor.subscribe();
    sleep(Duration::from_secs(3)).await;
    assert_eq!(monitor.refresh().await.unwrap(), RefreshOutcome::Unchanged);
    assert!(
        tokio::time::timeout(Duration::from_millis(10), stream.changed())
            .await
            .is_err()
    );
}

// ── Debounce ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn rapid_poll_requests_collapse_into_one() {
    let fake = two_devices();
    let monitor = monitor(&fake, test_config());

    monitor.request_poll();
    sleep(Duration::from_millis(100)).await;
    monitor.request_poll();
    sleep(Duration::from_millis(100)).await;
    monitor.request_poll();
    sleep(Duration::from_secs(1)).await;

    assert_eq!(fake.list_calls(), 1);
    assert!(monitor.has_initial_load_completed());
}

#[tokio::test(start_paused = true)]
async fn timer_ticks_inside_debounce_window_collapse() {
    let fake = two_devices();
    let monitor = monitor(
        &fake,
        MonitorConfig {
            poll_interval: Duration::from_millis(100),
            debounce: Duration::from_millis(500),
            cache_window: Duration::ZERO,
            ..test_config()
        },
    );
    monitor.start().await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(fake.list_calls(), 1);

    // Each tick supersedes the poll the previous one scheduled.
    sleep(Duration::from_secs(2)).await;
    assert_eq!(fake.list_calls(), 1);
    monitor.stop().await;

    sleep(Duration::from_secs(1)).await;
    assert_eq!(fake.list_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn scheduled_poll_yields_to_operation_started_after_tick() {
    let fake = two_devices();
    let monitor = monitor(
        &fake,
        MonitorConfig {
            poll_interval: Duration::from_secs(1),
            debounce: Duration::from_millis(500),
            cache_window: Duration::ZERO,
            boot_settle: Duration::from_secs(10),
            ..test_config()
        },
    );
    monitor.start().await;
    sleep(Duration::from_millis(1100)).await;
    assert_eq!(fake.list_calls(), 1);

    let _handle = monitor.boot(&DeviceId::from("A")).unwrap();
    sleep(Duration::from_millis(600)).await;
    assert!(monitor.is_operating());
    assert_eq!(fake.list_calls(), 1, "debounced poll must not fire mid-operation");
    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_scheduled_poll_in_flight() {
    let fake = two_devices();
    fake.hang_list.store(true, Ordering::SeqCst);
    let monitor = monitor(
        &fake,
        MonitorConfig {
            debounce: Duration::from_millis(100),
            ..test_config()
        },
    );

    monitor.request_poll();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(fake.list_calls(), 1);
    assert_eq!(monitor.phase(), MonitorPhase::Polling);

    let stopped = tokio::time::timeout(Duration::from_secs(1), monitor.stop()).await;
    assert!(stopped.is_ok(), "stop joins the scheduled poll");
    assert_ne!(monitor.phase(), MonitorPhase::Polling);
}

// ── Published state ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn first_refresh_publishes_sorted_groups() {
    let fake = two_devices();
    let monitor = monitor(&fake, test_config());
    assert!(monitor.is_loading());
    assert_eq!(monitor.phase(), MonitorPhase::Initializing);

    monitor.refresh().await.unwrap();

    let groups = monitor.device_groups();
    let names: Vec<_> = groups.iter().map(|g| g.display_name.as_str()).collect();
    assert_eq!(names, ["iOS 18.0", "iOS 17.5"]);
    assert!(!monitor.is_loading());
    assert!(monitor.view().last_refresh.is_some());
    assert_eq!(monitor.phase(), MonitorPhase::Idle);

    let ipad = monitor.device(&DeviceId::from("B")).unwrap();
    assert_eq!(ipad.physical_resolution, "1640*2360");
}

#[tokio::test(start_paused = true)]
async fn show_all_runtimes_seeds_empty_groups() {
    let fake = FakeControl::with_devices(vec![raw("A", "iPhone 16", "Shutdown", IOS_18)]);
    *fake.runtimes.lock().unwrap() = vec![RuntimeRecord {
        identifier: IOS_17.into(),
        name: "iOS 17.5".into(),
        version: Some("17.5".into()),
        build_version: None,
        platform: Some("iOS".into()),
        is_available: true,
        supported_device_types: Vec::new(),
    }];
    let monitor = monitor(
        &fake,
        MonitorConfig {
            show_all_runtimes: true,
            ..test_config()
        },
    );

    monitor.refresh().await.unwrap();
    let groups = monitor.device_groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].runtime_key, IOS_17);
    assert!(groups[1].devices.is_empty());
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_new_snapshots() {
    let fake = two_devices();
    let monitor = monitor(&fake, test_config());
    let mut stream = monitor.subscribe();
    assert!(stream.current().snapshot.is_empty());

    monitor.refresh().await.unwrap();
    let mut view = stream.changed().await.unwrap();
    while view.snapshot.is_empty() {
        view = stream.changed().await.unwrap();
    }
    assert_eq!(view.snapshot.devices.len(), 2);
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn failed_fetch_clears_loading_and_error_expires() {
    let fake = two_devices();
    fake.fail_list.store(true, Ordering::SeqCst);
    let monitor = monitor(&fake, test_config());

    let err = monitor.refresh().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ToolExecutionFailed);
    assert!(!monitor.is_loading());
    assert!(monitor.has_initial_load_completed());
    assert_eq!(
        monitor.last_error().map(|n| n.kind),
        Some(ErrorKind::ToolExecutionFailed)
    );

    sleep(Duration::from_millis(3100)).await;
    assert!(!monitor.has_error());
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_keeps_last_snapshot() {
    let fake = two_devices();
    let monitor = monitor(&fake, test_config());
    monitor.refresh().await.unwrap();

    fake.fail_list.store(true, Ordering::SeqCst);
    assert!(monitor.force_refresh().await.is_err());
    assert_eq!(monitor.devices().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_watchdog_clears_stalled_loading() {
    let fake = two_devices();
    let monitor = monitor(&fake, test_config());
    monitor.refresh().await.unwrap();
    fake.hang_list.store(true, Ordering::SeqCst);

    let background = monitor.clone();
    tokio::spawn(async move {
        let _ = background.manual_refresh().await;
    });

    sleep(Duration::from_millis(50)).await;
    assert!(monitor.is_loading());
    sleep(Duration::from_secs(2)).await;
    assert!(!monitor.is_loading());
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn ticks_are_skipped_while_operating() {
    let fake = two_devices();
    let monitor = monitor(
        &fake,
        MonitorConfig {
            poll_interval: Duration::from_secs(1),
            debounce: Duration::from_millis(100),
            cache_window: Duration::ZERO,
            boot_settle: Duration::from_secs(10),
            ..test_config()
        },
    );
    monitor.start().await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(fake.list_calls(), 1);

    let handle = monitor.boot(&DeviceId::from("A")).unwrap();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(fake.list_calls(), 1, "no polls while an operation is in flight");

    handle.wait().await.unwrap();
    assert_eq!(fake.list_calls(), 2);

    sleep(Duration::from_millis(2500)).await;
    assert!(fake.list_calls() >= 3, "polling resumes after the operation");
    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn start_prunes_before_first_poll() {
    let fake = two_devices();
    let monitor = monitor(
        &fake,
        MonitorConfig {
            prune_on_start: true,
            ..test_config()
        },
    );
    monitor.start().await;
    sleep(Duration::from_millis(10)).await;

    assert_eq!(fake.calls(), ["delete unavailable"]);
    assert_eq!(monitor.devices().len(), 2);
    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn describe_device_emits_toast() {
    let fake = two_devices();
    let monitor = monitor(&fake, test_config());
    monitor.refresh().await.unwrap();
    let mut toasts = monitor.toasts();

    let text = monitor.describe_device(&DeviceId::from("A")).unwrap();
    assert_eq!(
        text,
        "Device: iPhone 16\nSize: 6.1\"\nResolution: 1179*2556\nPoints: 393*852"
    );
    assert!(toasts.recv().await.unwrap().contains("iPhone 16"));

    let err = monitor.describe_device(&DeviceId::from("nope")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
    assert_eq!(
        monitor.device(&DeviceId::from("A")).map(|d| d.state),
        Some(DeviceState::Shutdown)
    );
}
