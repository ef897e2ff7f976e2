// ── Reactive fleet store ──
//
// Confirmed snapshot plus pending optimistic patches, published as one
// `watch` value.

mod fleet_store;
mod patch;

pub use fleet_store::{FleetStore, FleetView};
