//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use simfleet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const TOOL: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Tooling ──────────────────────────────────────────────────────
    #[error("Could not run `{program}`")]
    #[diagnostic(
        code(simfleet::tool_not_found),
        help(
            "Install Xcode and its command line tools, then run: xcode-select --install\n\
             Or point simfleet at a different binary with --xcrun"
        )
    )]
    ToolNotFound { program: String },

    #[error("{message}")]
    #[diagnostic(code(simfleet::tool_failed))]
    ToolFailed { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(simfleet::parse_failed),
        help("The installed Xcode may be newer than this simfleet release understands.")
    )]
    ParseFailed { message: String },

    #[error("`{command}` timed out after {timeout:?}")]
    #[diagnostic(
        code(simfleet::timeout),
        help("Increase the deadline with --timeout, or set tool.timeout_secs in the config file.")
    )]
    Timeout { command: String, timeout: Duration },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(simfleet::not_found),
        help("Run: simfleet {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("'{identifier}' matches more than one {resource_type}: {candidates}")]
    #[diagnostic(
        code(simfleet::ambiguous),
        help("Pass the full identifier instead.")
    )]
    Ambiguous {
        resource_type: String,
        identifier: String,
        candidates: String,
    },

    #[error("{message}")]
    #[diagnostic(code(simfleet::privileged), help("Run manually: {fallback}"))]
    Privileged { message: String, fallback: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(simfleet::config))]
    Config(Box<figment::Error>),

    #[error("{message}")]
    #[diagnostic(code(simfleet::metadata), help("Check the file named by metadata_file."))]
    Metadata { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(simfleet::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Operation cancelled")]
    #[diagnostic(code(simfleet::cancelled))]
    Cancelled,

    #[error("Internal error: {0}")]
    #[diagnostic(code(simfleet::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render configuration: {0}")]
    #[diagnostic(code(simfleet::toml))]
    Toml(#[from] toml::ser::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ToolNotFound { .. } => exit_code::TOOL,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Ambiguous { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Privileged { .. } => exit_code::PERMISSION,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ToolNotFound { program } => CliError::ToolNotFound { program },
            CoreError::ToolExecutionFailed { message } => CliError::ToolFailed { message },
            CoreError::ParseFailed { message } => CliError::ParseFailed { message },
            CoreError::Timeout { command, timeout } => CliError::Timeout { command, timeout },
            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "list".into(),
            },
            CoreError::RuntimeNotFound { runtime_key } => CliError::NotFound {
                resource_type: "runtime".into(),
                identifier: runtime_key,
                list_command: "runtimes --all-runtimes".into(),
            },
            CoreError::PrivilegedOperationFailed { message, fallback } => {
                CliError::Privileged { message, fallback }
            }
            CoreError::Config { message } => CliError::Metadata { message },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_maps_to_tool_exit_code() {
        let err = CliError::from(CoreError::ToolNotFound {
            program: "/nope/xcrun".into(),
        });
        assert_eq!(err.exit_code(), exit_code::TOOL);
        assert!(err.to_string().contains("/nope/xcrun"));
    }

    #[test]
    fn unknown_runtime_is_not_found() {
        let err = CliError::from(CoreError::RuntimeNotFound {
            runtime_key: "iOS-9-3".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(err.to_string(), "runtime 'iOS-9-3' not found");
    }
}
