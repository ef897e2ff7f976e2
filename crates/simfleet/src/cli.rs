//! Clap derive structures for the `simfleet` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// simfleet -- watch and drive the local simulator fleet
#[derive(Debug, Parser)]
#[command(
    name = "simfleet",
    version,
    about = "Watch and manage simulators from the command line",
    long_about = "Lists, boots, shuts down, creates and deletes simulators through\n\
        `xcrun simctl`, with a live `watch` view that reconciles the fleet\n\
        as it changes.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(long, env = "SIMFLEET_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Path to `xcrun` (overrides config)
    #[arg(long, env = "SIMFLEET_XCRUN", global = true)]
    pub xcrun: Option<PathBuf>,

    /// Per-call deadline for the control tool, in seconds
    #[arg(long, env = "SIMFLEET_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Include installed runtimes that have no devices
    #[arg(long, short = 'a', global = true)]
    pub all_runtimes: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SIMFLEET_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, env = "SIMFLEET_LOG_JSON", global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List devices
    #[command(alias = "ls")]
    List(ListArgs),

    /// Follow the fleet, printing every change
    Watch(WatchArgs),

    /// List runtimes with device counts
    #[command(alias = "rt")]
    Runtimes,

    /// Show a device's screen and model info
    Info(DeviceArg),

    /// Boot a device
    Boot(DeviceArg),

    /// Shut a device down
    Shutdown(DeviceArg),

    /// Create the default phone and tablet set for a runtime
    CreateDefaults(RuntimeArg),

    /// Delete every device on a runtime
    DeleteRuntime(DeleteRuntimeArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Arguments ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only devices on this runtime (key or display name, e.g. "iOS 18.0")
    #[arg(long, short = 'r')]
    pub runtime: Option<String>,

    /// Only booted devices
    #[arg(long, short = 'b')]
    pub booted: bool,

    /// Group output by runtime (table format only)
    #[arg(long, short = 'g')]
    pub grouped: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides config)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct DeviceArg {
    /// Device UDID or exact name
    pub device: String,
}

#[derive(Debug, Args)]
pub struct RuntimeArg {
    /// Runtime key, key suffix (e.g. "iOS-18-0") or display name
    pub runtime: String,
}

#[derive(Debug, Args)]
pub struct DeleteRuntimeArgs {
    /// Runtime key, key suffix (e.g. "iOS-18-0") or display name
    pub runtime: String,

    /// Also delete the runtime image (prompts for administrator access)
    #[arg(long)]
    pub image: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Print the effective configuration as TOML
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
