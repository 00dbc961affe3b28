// Backend wire types
//
// Models for the irrigation backend's JSON API. Field names follow the
// backend's camelCase conventions via explicit renames, including the
// `starTime` spelling the firmware ships with. Fields use
// `#[serde(default)]` liberally because controllers that have never
// reported omit most of them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Device type code for three-phase pump motors.
pub const DEVICE_TYPE_MOTOR: i32 = 1;
/// Device type code for gate valves.
pub const DEVICE_TYPE_GATE_VALVE: i32 = 2;

// ── Device ───────────────────────────────────────────────────────────

/// Live device record from `GET /Device/UserData/{userName}`.
///
/// One entry per controller mapped to the account, in the backend's
/// order. `device_type` discriminates motors (1) from gate valves (2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLive {
    pub imei: String,
    #[serde(default)]
    pub status: bool,
    /// Last commanded start, as a zone-less local wall-clock string.
    #[serde(default, rename = "starTime")]
    pub star_time: Option<String>,
    /// Last commanded stop, same encoding as `star_time`.
    #[serde(default, rename = "endTime")]
    pub end_time: Option<String>,
    /// 1=three-phase motor, 2=gate valve
    #[serde(default, rename = "deviceType")]
    pub device_type: i32,
    /// Whether this valve follows the motor when the motor starts.
    #[serde(default, rename = "defaultGV")]
    pub default_gv: bool,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body for `POST /Device/UpsertDeviceLive`.
///
/// `star_time`/`end_time` are serialized as `null` when absent; the
/// backend treats a null pair as "flip status only, keep the stored
/// schedule".
#[derive(Debug, Clone, Serialize)]
pub struct UpsertDeviceLive {
    pub imei: String,
    pub status: bool,
    #[serde(rename = "starTime")]
    pub star_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
}

/// Body for `POST /device/upsert-mapping`, pairing a motor controller
/// with a gate-valve controller under one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceMapping {
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "tPImei")]
    pub tp_imei: String,
    #[serde(rename = "gVImei")]
    pub gv_imei: String,
    #[serde(rename = "tpActive")]
    pub tp_active: bool,
    #[serde(rename = "gvActive")]
    pub gv_active: bool,
    #[serde(rename = "defaultGV")]
    pub default_gv: bool,
}

// ── Auth ─────────────────────────────────────────────────────────────

/// Body for `POST /Auth/Register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// IMEI of the first controller to bind to the account.
    pub imei: String,
}

// ── Time encoding ────────────────────────────────────────────────────

/// Wire format for schedule times: zone-less local wall clock,
/// whole seconds.
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Encode a local wall-clock time for the backend.
///
/// The backend stores whatever string it is given and the controllers
/// interpret it in their own local zone, so no offset or `Z` suffix is
/// ever emitted.
pub fn encode_wall_clock(dt: NaiveDateTime) -> String {
    dt.format(WALL_CLOCK_FORMAT).to_string()
}

/// Parse a backend schedule time.
///
/// Accepts the canonical whole-second form plus fractional seconds,
/// which some firmware revisions echo back.
pub fn parse_wall_clock(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, WALL_CLOCK_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};

    use super::*;

    #[test]
    fn device_live_deserializes_backend_shape() {
        let json = r#"{
            "imei": "862817041234567",
            "status": true,
            "starTime": "2024-03-10T13:30:00",
            "endTime": "2024-03-10T15:00:00",
            "deviceType": 1,
            "defaultGV": false,
            "signalStrength": 21
        }"#;
        let device: DeviceLive = serde_json::from_str(json).unwrap();
        assert_eq!(device.imei, "862817041234567");
        assert!(device.status);
        assert_eq!(device.device_type, DEVICE_TYPE_MOTOR);
        assert_eq!(device.star_time.as_deref(), Some("2024-03-10T13:30:00"));
        assert_eq!(device.extra["signalStrength"], 21);
    }

    #[test]
    fn device_live_tolerates_missing_fields() {
        let device: DeviceLive = serde_json::from_str(r#"{"imei": "5"}"#).unwrap();
        assert!(!device.status);
        assert!(device.star_time.is_none());
        assert_eq!(device.device_type, 0);
        assert!(!device.default_gv);
    }

    #[test]
    fn upsert_serializes_null_times() {
        let body = UpsertDeviceLive {
            imei: "862817041234567".into(),
            status: false,
            star_time: None,
            end_time: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "imei": "862817041234567",
                "status": false,
                "starTime": null,
                "endTime": null,
            })
        );
    }

    #[test]
    fn mapping_serializes_backend_field_names() {
        let body = DeviceMapping {
            user_name: "farm1".into(),
            tp_imei: "111".into(),
            gv_imei: "222".into(),
            tp_active: true,
            gv_active: true,
            default_gv: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["userName"], "farm1");
        assert_eq!(json["tPImei"], "111");
        assert_eq!(json["gVImei"], "222");
        assert_eq!(json["defaultGV"], false);
    }

    #[test]
    fn wall_clock_drops_zone_but_keeps_local_time() {
        // 08:30 UTC seen from UTC+5 must encode as the 13:30 wall clock.
        let instant = Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap();
        let zone = FixedOffset::east_opt(5 * 3600).unwrap();
        let local = instant.with_timezone(&zone);
        assert_eq!(encode_wall_clock(local.naive_local()), "2024-03-10T13:30:00");
    }

    #[test]
    fn wall_clock_parses_with_and_without_millis() {
        let plain = parse_wall_clock("2024-03-10T13:30:00").unwrap();
        let millis = parse_wall_clock("2024-03-10T13:30:00.000").unwrap();
        assert_eq!(plain, millis);
        assert!(parse_wall_clock("not a time").is_none());
    }

    #[test]
    fn wall_clock_round_trips() {
        let dt = parse_wall_clock("2025-06-01T04:05:06").unwrap();
        assert_eq!(encode_wall_clock(dt), "2025-06-01T04:05:06");
    }
}
