// ── Device domain types ──

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use headgate_api::types::{
    self, DEVICE_TYPE_GATE_VALVE, DEVICE_TYPE_MOTOR, DeviceLive, UpsertDeviceLive,
};

/// Canonical device kind, normalized from the backend's numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[non_exhaustive]
pub enum DeviceKind {
    /// Three-phase pump motor (`deviceType = 1`).
    #[strum(to_string = "motor")]
    Motor,
    /// Gate valve (`deviceType = 2`).
    #[strum(to_string = "gate-valve")]
    GateValve,
    /// A code this client does not know.
    #[strum(to_string = "unknown")]
    Unknown(i32),
}

impl DeviceKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            DEVICE_TYPE_MOTOR => Self::Motor,
            DEVICE_TYPE_GATE_VALVE => Self::GateValve,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Motor => DEVICE_TYPE_MOTOR,
            Self::GateValve => DEVICE_TYPE_GATE_VALVE,
            Self::Unknown(code) => code,
        }
    }

    pub fn is_motor(self) -> bool {
        matches!(self, Self::Motor)
    }

    pub fn is_gate_valve(self) -> bool {
        matches!(self, Self::GateValve)
    }
}

/// A scheduled start/stop pair, in local wall-clock time.
///
/// The backend and the field controllers share no timezone metadata;
/// both ends treat these as naive local times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
}

impl ScheduleWindow {
    pub fn new(start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        Self { start, stop }
    }

    /// A degenerate window with both edges at `now`, used to seed
    /// drafts for devices that have never been scheduled.
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            start: now,
            stop: now,
        }
    }
}

/// Canonical device as the session sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Controller identity. Never empty in backend data.
    pub imei: String,
    pub kind: DeviceKind,
    /// True when the motor is running or the valve is open.
    pub active: bool,
    /// Last schedule the backend has for this controller, if any.
    pub reported_start: Option<NaiveDateTime>,
    pub reported_stop: Option<NaiveDateTime>,
    /// Valve-only: follows the motor when the motor starts.
    pub default_valve: bool,
}

impl Device {
    /// Normalize a wire record into the domain model.
    ///
    /// Unparseable schedule strings degrade to `None` rather than
    /// failing the whole fetch.
    pub fn from_wire(live: &DeviceLive) -> Self {
        Self {
            imei: live.imei.clone(),
            kind: DeviceKind::from_code(live.device_type),
            active: live.status,
            reported_start: live.star_time.as_deref().and_then(types::parse_wall_clock),
            reported_stop: live.end_time.as_deref().and_then(types::parse_wall_clock),
            default_valve: live.default_gv,
        }
    }

    /// Build the wire body for a status-only flip (schedule untouched).
    pub fn status_upsert(&self, active: bool) -> UpsertDeviceLive {
        UpsertDeviceLive {
            imei: self.imei.clone(),
            status: active,
            star_time: None,
            end_time: None,
        }
    }

    /// Build the wire body for a schedule write. Scheduling always
    /// starts the device, so `status` is pinned to `true`.
    pub fn schedule_upsert(&self, window: ScheduleWindow) -> UpsertDeviceLive {
        UpsertDeviceLive {
            imei: self.imei.clone(),
            status: true,
            star_time: Some(types::encode_wall_clock(window.start)),
            end_time: Some(types::encode_wall_clock(window.stop)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wire(imei: &str, device_type: i32) -> DeviceLive {
        DeviceLive {
            imei: imei.into(),
            status: false,
            star_time: None,
            end_time: None,
            device_type,
            default_gv: false,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn kind_round_trips_known_codes() {
        assert_eq!(DeviceKind::from_code(1), DeviceKind::Motor);
        assert_eq!(DeviceKind::from_code(2), DeviceKind::GateValve);
        assert_eq!(DeviceKind::from_code(7), DeviceKind::Unknown(7));
        assert_eq!(DeviceKind::Unknown(7).code(), 7);
    }

    #[test]
    fn from_wire_parses_schedule() {
        let mut live = wire("motor-1", 1);
        live.star_time = Some("2024-03-10T13:30:00".into());
        live.end_time = Some("2024-03-10T15:00:00".into());

        let device = Device::from_wire(&live);

        assert!(device.kind.is_motor());
        let start = device.reported_start.unwrap();
        assert_eq!(types::encode_wall_clock(start), "2024-03-10T13:30:00");
    }

    #[test]
    fn from_wire_tolerates_garbage_times() {
        let mut live = wire("gv-1", 2);
        live.star_time = Some("not a time".into());

        let device = Device::from_wire(&live);

        assert!(device.reported_start.is_none());
    }

    #[test]
    fn schedule_upsert_always_starts() {
        let device = Device::from_wire(&wire("motor-1", 1));
        let window = ScheduleWindow::new(
            types::parse_wall_clock("2024-03-10T08:30:00").unwrap(),
            types::parse_wall_clock("2024-03-10T10:00:00").unwrap(),
        );

        let body = device.schedule_upsert(window);

        assert!(body.status);
        assert_eq!(body.star_time.as_deref(), Some("2024-03-10T08:30:00"));
        assert_eq!(body.end_time.as_deref(), Some("2024-03-10T10:00:00"));
    }

    #[test]
    fn status_upsert_leaves_schedule_null() {
        let device = Device::from_wire(&wire("gv-1", 2));
        let body = device.status_upsert(true);
        assert!(body.status);
        assert!(body.star_time.is_none());
        assert!(body.end_time.is_none());
    }
}
