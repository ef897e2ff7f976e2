// ── simctl API surface ──
//
// Subprocess-backed implementation of `DeviceControl`.

mod client;
pub mod models;

pub use client::SimctlClient;
