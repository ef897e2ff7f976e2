// ── Fleet store ──
//
// Holds the last confirmed snapshot and the pending optimistic patches
// under one mutex, and republishes their overlay on every change. All
// mutation goes through here, so subscribers only ever see a complete
// view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use super::patch::{self, PatchId, PendingPatch};
use crate::model::{DeviceId, DeviceState};
use crate::snapshot::FleetSnapshot;

/// What consumers observe.
#[derive(Debug, Clone, Default)]
pub struct FleetView {
    /// Confirmed snapshot with pending patches applied.
    pub snapshot: Arc<FleetSnapshot>,
    pub is_loading: bool,
    pub initial_load_completed: bool,
    /// Time of the last successful publish from the tool.
    pub last_refresh: Option<DateTime<Utc>>,
}

struct StoreState {
    confirmed: Arc<FleetSnapshot>,
    patches: Vec<PendingPatch>,
}

pub struct FleetStore {
    state: Mutex<StoreState>,
    view: watch::Sender<FleetView>,
    next_patch: AtomicU64,
}

impl FleetStore {
    pub fn new() -> Self {
        let (view, _) = watch::channel(FleetView {
            is_loading: true,
            ..FleetView::default()
        });
        Self {
            state: Mutex::new(StoreState {
                confirmed: Arc::new(FleetSnapshot::default()),
                patches: Vec::new(),
            }),
            view,
            next_patch: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recompute the published snapshot. Caller holds the state lock.
    fn publish(&self, state: &StoreState) {
        let snapshot = Self::overlay(state);
        self.view.send_modify(|view| view.snapshot = snapshot);
    }

    fn overlay(state: &StoreState) -> Arc<FleetSnapshot> {
        if state.patches.is_empty() {
            Arc::clone(&state.confirmed)
        } else {
            Arc::new(patch::overlay(&state.confirmed, &state.patches))
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn view(&self) -> FleetView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FleetView> {
        self.view.subscribe()
    }

    /// Published snapshot (patches applied).
    pub fn snapshot(&self) -> Arc<FleetSnapshot> {
        Arc::clone(&self.view.borrow().snapshot)
    }

    /// Last snapshot confirmed by the tool.
    pub fn confirmed(&self) -> Arc<FleetSnapshot> {
        Arc::clone(&self.lock().confirmed)
    }

    pub fn pending_patches(&self) -> usize {
        self.lock().patches.len()
    }

    pub fn is_loading(&self) -> bool {
        self.view.borrow().is_loading
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Replace the confirmed snapshot and drop every patch it resolves.
    pub(crate) fn confirm(&self, snapshot: Arc<FleetSnapshot>) {
        let mut state = self.lock();
        state.confirmed = snapshot;
        let before = state.patches.len();
        let confirmed = Arc::clone(&state.confirmed);
        state.patches.retain(|p| !p.is_resolved_by(&confirmed));
        if state.patches.len() != before {
            debug!(dropped = before - state.patches.len(), "patches resolved");
        }
        let snapshot = Self::overlay(&state);
        self.view.send_modify(|view| {
            view.snapshot = snapshot;
            view.last_refresh = Some(Utc::now());
        });
    }

    /// Drop patches resolved by the current confirmed snapshot.
    pub(crate) fn reconcile(&self) {
        let mut state = self.lock();
        let before = state.patches.len();
        let confirmed = Arc::clone(&state.confirmed);
        state.patches.retain(|p| !p.is_resolved_by(&confirmed));
        if state.patches.len() != before {
            debug!(dropped = before - state.patches.len(), "patches resolved");
            self.publish(&state);
        }
    }

    /// Overlay `state` on `device` until confirmed or settled.
    pub(crate) fn apply_patch(&self, device: DeviceId, state: DeviceState) -> PatchId {
        let id = PatchId(self.next_patch.fetch_add(1, Ordering::Relaxed));
        let mut guard = self.lock();
        guard.patches.push(PendingPatch {
            id,
            device,
            state,
            settled: false,
        });
        self.publish(&guard);
        id
    }

    /// Mark a patch as superseded by the next confirmed snapshot.
    pub(crate) fn settle_patch(&self, id: PatchId) {
        let mut state = self.lock();
        if let Some(p) = state.patches.iter_mut().find(|p| p.id == id) {
            p.settled = true;
        }
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.view.send_if_modified(|view| {
            let changed = view.is_loading != loading;
            view.is_loading = loading;
            changed
        });
    }

    /// Clear loading and flag the first load as done.
    pub(crate) fn finish_load(&self) {
        self.view.send_if_modified(|view| {
            let changed = view.is_loading || !view.initial_load_completed;
            view.is_loading = false;
            view.initial_load_completed = true;
            changed
        });
    }
}

impl Default for FleetStore {
    fn default() -> Self {
        Self::new()
    }
}
