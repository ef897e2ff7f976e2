// ── Domain model ──
//
// Canonical device records and runtime-key helpers. These are the types
// consumers see; raw tool output never leaks past `snapshot`.

mod device;
mod runtime;

pub use device::{Device, DeviceId, DeviceKind, DeviceState};
pub use runtime::{RUNTIME_PREFIX, extract_version, format_display_name};
