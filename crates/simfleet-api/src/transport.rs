// Shared subprocess plumbing for every tool invocation.
//
// All simctl, plutil, open and osascript calls go through `run`, which
// captures stdout/stderr, enforces the optional deadline, and maps
// launch/exit failures into `Error` variants.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::Error;

/// Longest stdout excerpt kept in a [`Error::ParseFailed`].
const MAX_ERROR_BODY: usize = 512;

/// Paths and limits for the external tools.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// `xcrun` binary; every simctl call is `xcrun simctl ...`.
    pub xcrun: PathBuf,
    /// `plutil`, used to read device-type profile plists as JSON.
    pub plutil: PathBuf,
    /// `open`, used to bring up the Simulator app.
    pub open: PathBuf,
    /// `osascript`, used for the elevation prompt on privileged deletes.
    pub osascript: PathBuf,
    /// Deadline for a single invocation. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            xcrun: PathBuf::from("/usr/bin/xcrun"),
            plutil: PathBuf::from("/usr/bin/plutil"),
            open: PathBuf::from("/usr/bin/open"),
            osascript: PathBuf::from("/usr/bin/osascript"),
            timeout: None,
        }
    }
}

/// Render a program + argument list for logs and error messages.
pub(crate) fn command_line(program: &Path, args: &[&str]) -> String {
    let mut line = program
        .file_name()
        .map_or_else(|| program.display().to_string(), |n| n.to_string_lossy().into_owned());
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run `program args...` to completion and return its stdout.
///
/// The child is killed if the future is dropped, which is how the timeout
/// tears it down.
pub(crate) async fn run(
    program: &Path,
    args: &[&str],
    timeout: Option<Duration>,
) -> Result<Vec<u8>, Error> {
    let command = command_line(program, args);
    debug!(%command, "invoking tool");
    let started = Instant::now();

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout {
                command: command.clone(),
                timeout: limit,
            })?,
        None => child.wait_with_output().await,
    }
    .map_err(|source| Error::Io {
        program: program.display().to_string(),
        source,
    })?;

    trace!(
        %command,
        elapsed_ms = started.elapsed().as_millis(),
        bytes = output.stdout.len(),
        "tool finished"
    );

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(Error::ExecutionFailed {
            command,
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

/// Decode stdout as JSON, keeping a truncated copy of the body on failure.
pub(crate) fn parse_json<T: DeserializeOwned>(command: &str, body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|e| {
        let text = String::from_utf8_lossy(body);
        let body = text.chars().take(MAX_ERROR_BODY).collect();
        Error::ParseFailed {
            command: command.to_owned(),
            message: e.to_string(),
            body,
        }
    })
}

fn spawn_error(program: &Path, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::ToolNotFound {
            program: program.display().to_string(),
        }
    } else {
        Error::Io {
            program: program.display().to_string(),
            source: err,
        }
    }
}
