// ── Domain model ──
//
// Canonical types the session and consumers work with. Wire shapes
// from `headgate-api` are normalized here and never leak past core.

pub mod device;

pub use device::{Device, DeviceKind, ScheduleWindow};
