use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `simfleet-api` crate.
///
/// Covers every failure mode of a tool invocation: launching the process,
/// a non-zero exit, a blown deadline, and malformed structured output.
/// `simfleet-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Process launch ──────────────────────────────────────────────
    /// The tool binary does not exist at the configured path.
    #[error("Tool not found: {program}")]
    ToolNotFound { program: String },

    /// The process could not be spawned or its pipes could not be read.
    #[error("Failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // ── Execution ───────────────────────────────────────────────────
    /// The tool exited with a non-zero status. `code` is `-1` when the
    /// process was terminated by a signal.
    #[error("`{command}` failed with exit code {code}: {stderr}")]
    ExecutionFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The configured deadline elapsed; the child has been killed.
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    // ── Data ────────────────────────────────────────────────────────
    /// Stdout was not the expected JSON shape, with a truncated body for debugging.
    #[error("Failed to parse output of `{command}`: {message}")]
    ParseFailed {
        command: String,
        message: String,
        body: String,
    },

    /// The requested runtime is not installed on this host.
    #[error("Runtime not found: {runtime_key}")]
    RuntimeNotFound { runtime_key: String },

    // ── Privileged ──────────────────────────────────────────────────
    /// An elevated operation was declined or failed. `fallback` is the
    /// command the user can run by hand.
    #[error("Privileged operation failed: {message}")]
    Privileged { message: String, fallback: String },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ToolNotFound,
    ExecutionFailed,
    ParseFailed,
    Timeout,
    NotFound,
    Privileged,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            Self::Io { .. } | Self::ExecutionFailed { .. } => ErrorKind::ExecutionFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ParseFailed { .. } => ErrorKind::ParseFailed,
            Self::RuntimeNotFound { .. } => ErrorKind::NotFound,
            Self::Privileged { .. } => ErrorKind::Privileged,
        }
    }
}
