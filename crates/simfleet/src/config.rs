//! CLI-owned configuration: TOML file + `SIMFLEET_*` environment,
//! translated into `ToolConfig` and `MonitorConfig`.
//!
//! Core never sees these types -- it receives pre-built configs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use simfleet_api::ToolConfig;
use simfleet_core::{MetadataLookup, MonitorConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config structs ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tool: ToolSection,

    #[serde(default)]
    pub monitor: MonitorSection,

    /// Replacement for the bundled device table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ToolSection {
    pub xcrun: PathBuf,
    pub plutil: PathBuf,
    pub open: PathBuf,
    pub osascript: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ToolSection {
    fn default() -> Self {
        let tool = ToolConfig::default();
        Self {
            xcrun: tool.xcrun,
            plutil: tool.plutil,
            open: tool.open,
            osascript: tool.osascript,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorSection {
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
    pub cache_window_ms: u64,
    pub boot_settle_ms: u64,
    pub shutdown_settle_ms: u64,
    pub error_expiry_ms: u64,
    pub show_all_runtimes: bool,
    pub prune_on_start: bool,
    pub probe_device_types: bool,
    pub open_simulator_on_boot: bool,
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Default for MonitorSection {
    fn default() -> Self {
        let m = MonitorConfig::default();
        Self {
            poll_interval_ms: millis(m.poll_interval),
            debounce_ms: millis(m.debounce),
            cache_window_ms: millis(m.cache_window),
            boot_settle_ms: millis(m.boot_settle),
            shutdown_settle_ms: millis(m.shutdown_settle),
            error_expiry_ms: millis(m.error_expiry),
            show_all_runtimes: m.show_all_runtimes,
            prune_on_start: m.prune_on_start,
            probe_device_types: m.probe_device_types,
            open_simulator_on_boot: m.open_simulator_on_boot,
        }
    }
}

// ── Config file location ─────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "simfleet", "simfleet").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("simfleet");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// The file `--config` points at, else the platform default.
pub fn effective_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

// ── Config loading ───────────────────────────────────────────────────

/// Load file + environment. A missing file is not an error.
pub fn load_config(path: &Path) -> Result<Config, CliError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SIMFLEET_").split("__"));

    Ok(figment.extract()?)
}

// ── Translation into core types ──────────────────────────────────────

/// Tool paths and deadline, flags over file.
pub fn tool_config(cfg: &Config, global: &GlobalOpts) -> ToolConfig {
    ToolConfig {
        xcrun: global.xcrun.clone().unwrap_or_else(|| cfg.tool.xcrun.clone()),
        plutil: cfg.tool.plutil.clone(),
        open: cfg.tool.open.clone(),
        osascript: cfg.tool.osascript.clone(),
        timeout: global
            .timeout
            .or(cfg.tool.timeout_secs)
            .map(Duration::from_secs),
    }
}

/// Reconciler settings, flags over file.
pub fn monitor_config(cfg: &Config, global: &GlobalOpts) -> MonitorConfig {
    let m = &cfg.monitor;
    MonitorConfig {
        poll_interval: Duration::from_millis(m.poll_interval_ms),
        debounce: Duration::from_millis(m.debounce_ms),
        cache_window: Duration::from_millis(m.cache_window_ms),
        boot_settle: Duration::from_millis(m.boot_settle_ms),
        shutdown_settle: Duration::from_millis(m.shutdown_settle_ms),
        error_expiry: Duration::from_millis(m.error_expiry_ms),
        show_all_runtimes: global.all_runtimes || m.show_all_runtimes,
        prune_on_start: m.prune_on_start,
        probe_device_types: m.probe_device_types,
        open_simulator_on_boot: m.open_simulator_on_boot,
        ..MonitorConfig::default()
    }
}

/// Bundled device table, or the configured replacement.
pub fn metadata_lookup(cfg: &Config) -> Result<MetadataLookup, CliError> {
    match cfg.metadata_file {
        Some(ref path) => Ok(MetadataLookup::from_json_file(path)?),
        None => Ok(MetadataLookup::bundled()),
    }
}
