// ── Reactive fleet stream ──
//
// Subscription type for consuming published view changes.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::FleetView;

/// A subscription to the published fleet view.
///
/// Provides point-in-time access and change notification via
/// `changed()` or by converting to a `Stream`.
pub struct FleetStream {
    current: FleetView,
    receiver: watch::Receiver<FleetView>,
}

impl FleetStream {
    pub(crate) fn new(mut receiver: watch::Receiver<FleetView>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The view captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &FleetView {
        &self.current
    }

    /// The latest published view.
    pub fn latest(&self) -> FleetView {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the monitor is gone.
    pub async fn changed(&mut self) -> Option<FleetView> {
        self.receiver.changed().await.ok()?;
        let view = self.receiver.borrow_and_update().clone();
        self.current = view.clone();
        Some(view)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> FleetWatchStream {
        FleetWatchStream {
            inner: WatchStream::from_changes(self.receiver),
        }
    }
}

/// `Stream` adapter yielding each newly published view.
pub struct FleetWatchStream {
    inner: WatchStream<FleetView>,
}

impl Stream for FleetWatchStream {
    type Item = FleetView;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
