// ── Monitor configuration ──
//
// Timing and behaviour knobs for the reconciler. Consumers (the CLI)
// build this from their own config layer; core never reads files.

use std::time::Duration;

/// Reconciler settings. `Default` gives the production cadence.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Periodic poll cadence. `Duration::ZERO` disables the timer.
    pub poll_interval: Duration,
    /// Quiet period before a requested poll actually runs.
    pub debounce: Duration,
    /// How long a published snapshot satisfies `refresh()` without a fetch.
    pub cache_window: Duration,
    /// Delay before a manual refresh issues its fetch.
    pub manual_refresh_delay: Duration,
    /// Upper bound on how long a manual refresh may hold the loading flag.
    pub manual_refresh_watchdog: Duration,
    /// Settle delay after a boot call before reconciling.
    pub boot_settle: Duration,
    /// Settle delay after a shutdown call before reconciling.
    pub shutdown_settle: Duration,
    /// Pause between shutting down a booted device and deleting it.
    pub delete_settle: Duration,
    /// How long a reported error stays current.
    pub error_expiry: Duration,
    /// Operations slower than this are logged at `warn`.
    pub slow_operation_threshold: Duration,
    /// Seed one (possibly empty) group per installed runtime.
    pub show_all_runtimes: bool,
    /// Remove unavailable devices before the first poll.
    pub prune_on_start: bool,
    /// Read device-type bundles for authoritative screen geometry.
    pub probe_device_types: bool,
    /// Foreground the Simulator app after a successful boot.
    pub open_simulator_on_boot: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            debounce: Duration::from_millis(500),
            cache_window: Duration::from_secs(2),
            manual_refresh_delay: Duration::from_millis(100),
            manual_refresh_watchdog: Duration::from_secs(2),
            boot_settle: Duration::from_secs(2),
            shutdown_settle: Duration::from_secs(1),
            delete_settle: Duration::from_millis(500),
            error_expiry: Duration::from_secs(3),
            slow_operation_threshold: Duration::from_secs(2),
            show_all_runtimes: false,
            prune_on_start: true,
            probe_device_types: true,
            open_simulator_on_boot: true,
        }
    }
}

impl MonitorConfig {
    /// Settings for a single fetch-and-exit run: no timer, no side effects
    /// beyond the requested command.
    pub fn oneshot() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            prune_on_start: false,
            open_simulator_on_boot: false,
            ..Self::default()
        }
    }
}
