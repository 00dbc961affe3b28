// ── Command API ──
//
// All backend writes flow through a unified `Command` enum. The
// controller routes each variant to the matching API call and applies
// the session mutation only after that call succeeds.

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::oneshot;

use headgate_api::types::RegisterRequest;

use crate::error::CoreError;
use crate::model::ScheduleWindow;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandOutcome, CoreError>>,
}

/// All backend-mutating operations plus the explicit re-fetch.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Motor operations ─────────────────────────────────────────────
    StartMotor,
    StopMotor,
    ScheduleMotor { window: ScheduleWindow },

    // ── Valve operations ─────────────────────────────────────────────
    StartValve { imei: String },
    StopValve { imei: String },
    ScheduleValve { imei: String, window: ScheduleWindow },
    SetDefaultValve { imei: String },

    // ── Account operations ───────────────────────────────────────────
    RegisterMapping(MappingRequest),

    // ── Data ─────────────────────────────────────────────────────────
    Refresh,
}

/// Result payload for a processed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Ok,
    Refreshed { device_count: usize },
}

/// Request payload for pairing a motor controller with a gate valve.
///
/// The account user name is supplied by the controller from the active
/// session, never by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRequest {
    pub motor_imei: String,
    pub valve_imei: String,
    pub motor_active: bool,
    pub valve_active: bool,
    pub default_valve: bool,
}

impl MappingRequest {
    /// A mapping with the backend's customary initial flags: both
    /// controllers active, valve not yet the default.
    pub fn new(motor_imei: impl Into<String>, valve_imei: impl Into<String>) -> Self {
        Self {
            motor_imei: motor_imei.into(),
            valve_imei: valve_imei.into(),
            motor_active: true,
            valve_active: true,
            default_valve: false,
        }
    }

    /// Local validation, run before any network traffic.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.motor_imei.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "motor IMEI is required".into(),
            });
        }
        if self.valve_imei.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "valve IMEI is required".into(),
            });
        }
        Ok(())
    }
}

/// Request payload for creating a new account.
///
/// Registration runs outside the command channel because it belongs
/// to the logged-out world; it lives here with the other typed
/// request payloads.
#[derive(Debug, Clone)]
pub struct RegisterAccount {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: SecretString,
    /// IMEI of the first controller bound to the account.
    pub imei: String,
}

impl RegisterAccount {
    /// Local validation, run before any network traffic. Every field
    /// is required; the backend enforces the rest (uniqueness, IMEI
    /// existence).
    pub fn validate(&self) -> Result<(), CoreError> {
        let fields = [
            ("user name", self.user_name.as_str()),
            ("first name", self.first_name.as_str()),
            ("last name", self.last_name.as_str()),
            ("email", self.email.as_str()),
            ("password", self.password.expose_secret()),
            ("IMEI", self.imei.as_str()),
        ];
        for (label, value) in fields {
            if value.trim().is_empty() {
                return Err(CoreError::ValidationFailed {
                    message: format!("{label} is required"),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn to_wire(&self) -> RegisterRequest {
        RegisterRequest {
            user_name: self.user_name.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            password: self.password.expose_secret().to_owned(),
            imei: self.imei.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account() -> RegisterAccount {
        RegisterAccount {
            user_name: "farm1".into(),
            first_name: "Aral".into(),
            last_name: "Karasu".into(),
            email: "aral@example.com".into(),
            password: SecretString::from("hunter2"),
            imei: "356938035643809".into(),
        }
    }

    #[test]
    fn mapping_defaults_match_backend_conventions() {
        let req = MappingRequest::new("motor-1", "gv-1");
        assert!(req.motor_active);
        assert!(req.valve_active);
        assert!(!req.default_valve);
    }

    #[test]
    fn mapping_validation_requires_both_imeis() {
        assert!(MappingRequest::new("motor-1", "gv-1").validate().is_ok());
        assert!(MappingRequest::new("", "gv-1").validate().is_err());
        assert!(MappingRequest::new("motor-1", "  ").validate().is_err());
    }

    #[test]
    fn register_validation_rejects_any_blank_field() {
        assert!(account().validate().is_ok());

        let mut a = account();
        a.email = String::new();
        let err = a.validate().unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));

        let mut a = account();
        a.password = SecretString::from("   ");
        assert!(a.validate().is_err());
    }

    #[test]
    fn register_wire_payload_exposes_password_once() {
        let wire = account().to_wire();
        assert_eq!(wire.user_name, "farm1");
        assert_eq!(wire.password, "hunter2");
        assert_eq!(wire.imei, "356938035643809");
    }
}
