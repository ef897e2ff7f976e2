// Operation timing.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Logs the duration of a named operation when dropped.
///
/// Anything over `threshold` is reported at `warn`.
pub(crate) struct OperationTimer {
    name: &'static str,
    started: Instant,
    threshold: Duration,
}

impl OperationTimer {
    pub(crate) fn start(name: &'static str, threshold: Duration) -> Self {
        debug!(operation = name, "operation started");
        Self {
            name,
            started: Instant::now(),
            threshold,
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        if elapsed > self.threshold {
            warn!(operation = self.name, elapsed_ms, "slow operation");
        } else {
            debug!(operation = self.name, elapsed_ms, "operation finished");
        }
    }
}
