// Optimistic state patches.

use std::collections::HashMap;

use crate::model::{DeviceId, DeviceState};
use crate::snapshot::FleetSnapshot;

/// Handle for one applied patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PatchId(pub(crate) u64);

/// A local state override waiting for the tool to catch up.
#[derive(Debug, Clone)]
pub(super) struct PendingPatch {
    pub id: PatchId,
    pub device: DeviceId,
    pub state: DeviceState,
    /// Set once the operation's settle delay has passed; the next
    /// confirmed snapshot then wins unconditionally.
    pub settled: bool,
}

impl PendingPatch {
    /// Whether `confirmed` makes this patch redundant.
    pub fn is_resolved_by(&self, confirmed: &FleetSnapshot) -> bool {
        if self.settled {
            return true;
        }
        confirmed
            .device(&self.device)
            .is_none_or(|d| d.state == self.state)
    }
}

/// Overlay patches onto `confirmed`, later patches winning per device.
pub(super) fn overlay(confirmed: &FleetSnapshot, patches: &[PendingPatch]) -> FleetSnapshot {
    let states: HashMap<&DeviceId, &DeviceState> =
        patches.iter().map(|p| (&p.device, &p.state)).collect();
    confirmed.with_states(&states)
}
