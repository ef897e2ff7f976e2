// ── Error channel ──
//
// The single "current error" slot. A report replaces whatever is there
// and restarts the expiry window; the notice clears itself once the
// window passes without a newer report.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{CoreError, ErrorKind};

/// A published error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotice {
    pub kind: ErrorKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

struct Slot {
    current: watch::Sender<Option<ErrorNotice>>,
    generation: AtomicU64,
}

/// Cloneable handle to the current-error slot.
#[derive(Clone)]
pub struct ErrorChannel {
    slot: Arc<Slot>,
    expiry: Duration,
}

impl ErrorChannel {
    pub fn new(expiry: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            slot: Arc::new(Slot {
                current,
                generation: AtomicU64::new(0),
            }),
            expiry,
        }
    }

    /// Publish `err` as the current error and schedule its expiry.
    pub fn report(&self, err: &CoreError) {
        warn!(kind = %err.kind(), error = %err, "error reported");
        let generation = self.slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.slot.current.send_replace(Some(ErrorNotice {
            kind: err.kind(),
            message: err.to_string(),
            raised_at: Utc::now(),
        }));

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let slot = Arc::clone(&self.slot);
        let expiry = self.expiry;
        runtime.spawn(async move {
            tokio::time::sleep(expiry).await;
            // Only the most recent report may clear the slot.
            if slot.generation.load(Ordering::SeqCst) == generation {
                debug!("error notice expired");
                slot.current.send_replace(None);
            }
        });
    }

    /// Clear the current error immediately.
    pub fn dismiss(&self) {
        self.slot.generation.fetch_add(1, Ordering::SeqCst);
        self.slot.current.send_replace(None);
    }

    pub fn current(&self) -> Option<ErrorNotice> {
        self.slot.current.borrow().clone()
    }

    pub fn has_error(&self) -> bool {
        self.slot.current.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ErrorNotice>> {
        self.slot.current.subscribe()
    }
}

impl std::fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorChannel")
            .field("current", &*self.slot.current.borrow())
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(message: &str) -> CoreError {
        CoreError::ToolExecutionFailed {
            message: message.into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn notice_expires_after_window() {
        let errors = ErrorChannel::new(Duration::from_secs(3));
        errors.report(&failure("boom"));
        assert!(errors.has_error());

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(errors.has_error());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!errors.has_error());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_report_restarts_window() {
        let errors = ErrorChannel::new(Duration::from_secs(3));
        errors.report(&failure("first"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        errors.report(&failure("second"));

        // First report's timer fires here but must not clear the second.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let notice = errors.current().expect("second notice still current");
        assert!(notice.message.contains("second"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(errors.current().is_none());
    }

    #[tokio::test]
    async fn dismiss_clears_immediately() {
        let errors = ErrorChannel::new(Duration::from_secs(3));
        errors.report(&CoreError::DeviceNotFound {
            identifier: "X".into(),
        });
        assert_eq!(errors.current().map(|n| n.kind), Some(ErrorKind::DeviceNotFound));
        errors.dismiss();
        assert!(!errors.has_error());
    }
}
