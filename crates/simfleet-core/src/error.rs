// ── Core error types ──
//
// User-facing errors from simfleet-core. Consumers never see exit codes
// or raw JSON failures; `From<simfleet_api::Error>` folds transport
// errors into the domain variants below.

use std::time::Duration;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Tool errors ──────────────────────────────────────────────────
    #[error("Device-control tool not found: {program}")]
    ToolNotFound { program: String },

    #[error("Device-control tool failed: {message}")]
    ToolExecutionFailed { message: String },

    #[error("Unexpected output from the device-control tool: {message}")]
    ParseFailed { message: String },

    #[error("Device-control call timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Runtime not found: {runtime_key}")]
    RuntimeNotFound { runtime_key: String },

    // ── Privileged operations ────────────────────────────────────────
    #[error("Privileged operation failed: {message}. Run manually: {fallback}")]
    PrivilegedOperationFailed { message: String, fallback: String },

    // ── Configuration / internal ─────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error class carried on published error notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    ToolNotFound,
    ToolExecutionFailed,
    ParseFailed,
    Timeout,
    DeviceNotFound,
    RuntimeNotFound,
    PrivilegedOperationFailed,
    Config,
    Internal,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            Self::ToolExecutionFailed { .. } => ErrorKind::ToolExecutionFailed,
            Self::ParseFailed { .. } => ErrorKind::ParseFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::DeviceNotFound { .. } => ErrorKind::DeviceNotFound,
            Self::RuntimeNotFound { .. } => ErrorKind::RuntimeNotFound,
            Self::PrivilegedOperationFailed { .. } => ErrorKind::PrivilegedOperationFailed,
            Self::Config { .. } => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<simfleet_api::Error> for CoreError {
    fn from(err: simfleet_api::Error) -> Self {
        use simfleet_api::Error as Api;

        match err {
            Api::ToolNotFound { program } => Self::ToolNotFound { program },
            Api::Io { .. } | Api::ExecutionFailed { .. } => Self::ToolExecutionFailed {
                message: err.to_string(),
            },
            Api::Timeout { command, timeout } => Self::Timeout { command, timeout },
            Api::ParseFailed { command, message, .. } => Self::ParseFailed {
                message: format!("{command}: {message}"),
            },
            Api::RuntimeNotFound { runtime_key } => Self::RuntimeNotFound { runtime_key },
            Api::Privileged { message, fallback } => {
                Self::PrivilegedOperationFailed { message, fallback }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_failure_keeps_stderr_in_message() {
        let err: CoreError = simfleet_api::Error::ExecutionFailed {
            command: "xcrun simctl boot A".into(),
            code: 149,
            stderr: "Unable to boot device in current state: Booted".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ToolExecutionFailed);
        assert!(err.to_string().contains("current state: Booted"));
    }

    #[test]
    fn privileged_failure_exposes_fallback() {
        let err: CoreError = simfleet_api::Error::Privileged {
            message: "User canceled".into(),
            fallback: "sudo xcrun simctl runtime delete X".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::PrivilegedOperationFailed);
        assert!(err.to_string().ends_with("Run manually: sudo xcrun simctl runtime delete X"));
    }

    #[test]
    fn kind_renders_snake_case() {
        assert_eq!(ErrorKind::ToolNotFound.to_string(), "tool_not_found");
    }
}
