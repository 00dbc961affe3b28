// ── Device session ──
//
// In-memory view over one account's controllers: the single pump
// motor, the ordered valve list, the valve carousel selection, and
// per-device schedule drafts. The session is pure state -- it performs
// no I/O. The controller calls an applier only after the matching
// backend write has succeeded, so a failed write can never move this
// state ("await, then mutate").

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Device, ScheduleWindow};

/// How to treat accounts that report more than one motor controller.
///
/// The backend does not promise a single motor per account. Installs
/// in the field overwhelmingly have exactly one, so the permissive
/// policy is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MotorPolicy {
    /// Keep the first motor in backend order, ignore the rest.
    #[default]
    FirstWins,
    /// Refuse to build a session until the account is cleaned up.
    Strict,
}

/// One account's device view, rebuilt from each fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceSession {
    user_name: String,
    motor: Option<Device>,
    /// Gate valves in backend response order. Never reordered locally.
    valves: Vec<Device>,
    /// Carousel cursor. Always `< valves.len()` when valves exist;
    /// pinned to 0 (and meaningless) when the list is empty.
    current_valve: usize,
    /// Editable schedule per device IMEI, seeded from reported times.
    drafts: HashMap<String, ScheduleWindow>,
}

impl DeviceSession {
    /// An empty session for a user, before the first fetch.
    pub fn for_user(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            ..Self::default()
        }
    }

    /// Build a session from a fetched device list.
    ///
    /// Splits the list into the motor and the ordered valves, then
    /// seeds a schedule draft for every device: the reported times
    /// when the backend has them, otherwise a degenerate window at
    /// `now`. Devices with unknown type codes are dropped from the
    /// view.
    pub fn from_devices(
        user_name: impl Into<String>,
        devices: Vec<Device>,
        policy: MotorPolicy,
        now: NaiveDateTime,
    ) -> Result<Self, CoreError> {
        let (motor, valves) = classify(devices, policy)?;

        let mut session = Self {
            user_name: user_name.into(),
            motor,
            valves,
            current_valve: 0,
            drafts: HashMap::new(),
        };
        session.seed_drafts(now);
        Ok(session)
    }

    /// Rebuild from a fresh fetch, keeping what survives: the selected
    /// valve (matched by IMEI) and any drafts for still-present
    /// devices. Drafts for devices that disappeared are dropped.
    pub fn refresh_from(
        &mut self,
        devices: Vec<Device>,
        policy: MotorPolicy,
        now: NaiveDateTime,
    ) -> Result<(), CoreError> {
        let selected = self.current_valve().map(|v| v.imei.clone());
        let (motor, valves) = classify(devices, policy)?;

        self.motor = motor;
        self.valves = valves;
        self.current_valve = selected
            .and_then(|imei| self.valves.iter().position(|v| v.imei == imei))
            .unwrap_or(0);

        self.drafts.retain(|imei, _| {
            self.valves.iter().any(|v| &v.imei == imei)
                || self.motor.as_ref().is_some_and(|m| &m.imei == imei)
        });
        self.seed_drafts(now);
        Ok(())
    }

    fn seed_drafts(&mut self, now: NaiveDateTime) {
        let devices = self.motor.iter().chain(self.valves.iter());
        for device in devices {
            let window = match (device.reported_start, device.reported_stop) {
                (Some(start), Some(stop)) => ScheduleWindow::new(start, stop),
                _ => ScheduleWindow::at(now),
            };
            self.drafts.entry(device.imei.clone()).or_insert(window);
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn motor(&self) -> Option<&Device> {
        self.motor.as_ref()
    }

    pub fn valves(&self) -> &[Device] {
        &self.valves
    }

    pub fn valve_count(&self) -> usize {
        self.valves.len()
    }

    /// True when the account has no devices at all.
    pub fn is_empty(&self) -> bool {
        self.motor.is_none() && self.valves.is_empty()
    }

    pub fn current_valve_index(&self) -> usize {
        self.current_valve
    }

    pub fn current_valve(&self) -> Option<&Device> {
        self.valves.get(self.current_valve)
    }

    /// 1-based carousel position for display, with the total count.
    pub fn valve_position(&self) -> Option<(usize, usize)> {
        if self.valves.is_empty() {
            None
        } else {
            Some((self.current_valve + 1, self.valves.len()))
        }
    }

    /// Any device (motor or valve) by IMEI.
    pub fn device(&self, imei: &str) -> Option<&Device> {
        self.motor
            .as_ref()
            .filter(|m| m.imei == imei)
            .or_else(|| self.valves.iter().find(|v| v.imei == imei))
    }

    /// The gate valve with the given IMEI, or `ValveNotFound`.
    pub fn valve(&self, imei: &str) -> Result<&Device, CoreError> {
        self.valves
            .iter()
            .find(|v| v.imei == imei)
            .ok_or_else(|| CoreError::ValveNotFound { imei: imei.into() })
    }

    /// The schedule draft for a device, if the device is known.
    pub fn draft(&self, imei: &str) -> Option<ScheduleWindow> {
        self.drafts.get(imei).copied()
    }

    // ── Carousel navigation ──────────────────────────────────────────

    /// Advance the carousel, wrapping past the end. No-op when empty.
    pub fn next_valve(&mut self) {
        if self.valves.is_empty() {
            return;
        }
        self.current_valve = (self.current_valve + 1) % self.valves.len();
    }

    /// Retreat the carousel, wrapping below zero. No-op when empty.
    pub fn previous_valve(&mut self) {
        if self.valves.is_empty() {
            return;
        }
        self.current_valve = (self.current_valve + self.valves.len() - 1) % self.valves.len();
    }

    /// Jump the carousel to a specific valve.
    pub fn select_valve(&mut self, imei: &str) -> Result<(), CoreError> {
        let index = self
            .valves
            .iter()
            .position(|v| v.imei == imei)
            .ok_or_else(|| CoreError::ValveNotFound { imei: imei.into() })?;
        self.current_valve = index;
        Ok(())
    }

    // ── Draft editing (local only, never touches the backend) ────────

    pub fn set_draft_start(&mut self, imei: &str, start: NaiveDateTime) {
        if let Some(draft) = self.drafts.get_mut(imei) {
            draft.start = start;
        } else {
            self.drafts
                .insert(imei.to_owned(), ScheduleWindow::new(start, start));
        }
    }

    pub fn set_draft_stop(&mut self, imei: &str, stop: NaiveDateTime) {
        if let Some(draft) = self.drafts.get_mut(imei) {
            draft.stop = stop;
        } else {
            self.drafts
                .insert(imei.to_owned(), ScheduleWindow::new(stop, stop));
        }
    }

    // ── State appliers (post-success only) ───────────────────────────

    /// Record a confirmed motor write: status, and schedule when one
    /// was sent. A start also triggers [`DeviceSession::follow_motor`].
    pub fn apply_motor_update(&mut self, active: bool, window: Option<ScheduleWindow>) {
        let Some(motor) = self.motor.as_mut() else {
            debug!("motor update with no motor in session, ignoring");
            return;
        };
        motor.active = active;
        if let Some(window) = window {
            motor.reported_start = Some(window.start);
            motor.reported_stop = Some(window.stop);
            self.drafts.insert(motor.imei.clone(), window);
        }
        if active {
            Self::follow_motor(&mut self.valves);
        }
    }

    /// The motor-follow rule: starting the motor also opens every
    /// valve flagged as default. One-directional -- stopping the motor
    /// never closes a valve, and no re-fetch confirms the coupling.
    fn follow_motor(valves: &mut [Device]) {
        for valve in valves.iter_mut().filter(|v| v.default_valve) {
            valve.active = true;
        }
    }

    /// Record a confirmed valve write. Only the matching IMEI moves;
    /// an unknown IMEI is absorbed (the valve may have been unmapped
    /// while the request was in flight).
    pub fn apply_valve_update(&mut self, imei: &str, active: bool, window: Option<ScheduleWindow>) {
        let Some(valve) = self.valves.iter_mut().find(|v| v.imei == imei) else {
            debug!(imei, "valve update for unknown valve, ignoring");
            return;
        };
        valve.active = active;
        if let Some(window) = window {
            valve.reported_start = Some(window.start);
            valve.reported_stop = Some(window.stop);
            self.drafts.insert(imei.to_owned(), window);
        }
    }

    /// Record a confirmed default-valve change: the matching valve
    /// becomes the default and every other valve loses the flag in the
    /// same step, so no observer ever sees two defaults.
    pub fn apply_default_valve(&mut self, imei: &str) {
        for valve in &mut self.valves {
            valve.default_valve = valve.imei == imei;
        }
    }
}

// ── Classification ───────────────────────────────────────────────────

/// Split a fetched list into (motor, valves), preserving backend order
/// among the valves.
fn classify(
    devices: Vec<Device>,
    policy: MotorPolicy,
) -> Result<(Option<Device>, Vec<Device>), CoreError> {
    let motor_count = devices.iter().filter(|d| d.kind.is_motor()).count();
    if motor_count > 1 {
        match policy {
            MotorPolicy::Strict => {
                return Err(CoreError::MultipleMotors { count: motor_count });
            }
            MotorPolicy::FirstWins => {
                warn!(
                    motor_count,
                    "account reports multiple motors, keeping the first"
                );
            }
        }
    }

    let mut motor = None;
    let mut valves = Vec::new();
    for device in devices {
        if device.kind.is_motor() {
            if motor.is_none() {
                motor = Some(device);
            }
        } else if device.kind.is_gate_valve() {
            valves.push(device);
        } else {
            debug!(imei = %device.imei, code = device.kind.code(), "dropping device with unknown type");
        }
    }
    Ok((motor, valves))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use headgate_api::types::parse_wall_clock;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::DeviceKind;

    fn device(imei: &str, kind: DeviceKind) -> Device {
        Device {
            imei: imei.into(),
            kind,
            active: false,
            reported_start: None,
            reported_stop: None,
            default_valve: false,
        }
    }

    fn motor(imei: &str) -> Device {
        device(imei, DeviceKind::Motor)
    }

    fn valve(imei: &str) -> Device {
        device(imei, DeviceKind::GateValve)
    }

    fn default_valve(imei: &str) -> Device {
        Device {
            default_valve: true,
            ..valve(imei)
        }
    }

    fn t(s: &str) -> NaiveDateTime {
        parse_wall_clock(s).unwrap()
    }

    fn now() -> NaiveDateTime {
        t("2024-03-10T12:00:00")
    }

    fn session(devices: Vec<Device>) -> DeviceSession {
        DeviceSession::from_devices("farm1", devices, MotorPolicy::FirstWins, now()).unwrap()
    }

    // ── Classification ──────────────────────────────────────────────

    #[test]
    fn classify_keeps_first_motor_and_valve_order() {
        let s = session(vec![
            valve("gv-x"),
            motor("motor-a"),
            valve("gv-b"),
            motor("motor-c"),
            valve("gv-d"),
        ]);

        assert_eq!(s.motor().unwrap().imei, "motor-a");
        let imeis: Vec<_> = s.valves().iter().map(|v| v.imei.as_str()).collect();
        assert_eq!(imeis, vec!["gv-x", "gv-b", "gv-d"]);
    }

    #[test]
    fn classify_drops_unknown_type_codes() {
        let s = session(vec![
            device("weather-1", DeviceKind::Unknown(9)),
            valve("gv-1"),
        ]);

        assert!(s.motor().is_none());
        assert_eq!(s.valve_count(), 1);
    }

    #[test]
    fn strict_policy_rejects_second_motor() {
        let err = DeviceSession::from_devices(
            "farm1",
            vec![motor("m-1"), motor("m-2")],
            MotorPolicy::Strict,
            now(),
        )
        .unwrap_err();

        assert!(matches!(err, CoreError::MultipleMotors { count: 2 }));
    }

    #[test]
    fn empty_account_builds_empty_session() {
        let s = session(vec![]);
        assert!(s.is_empty());
        assert!(s.current_valve().is_none());
        assert!(s.valve_position().is_none());
    }

    // ── Carousel ────────────────────────────────────────────────────

    #[test]
    fn next_n_times_returns_to_origin() {
        let mut s = session(vec![valve("a"), valve("b"), valve("c")]);
        let origin = s.current_valve_index();

        for _ in 0..3 {
            s.next_valve();
        }
        assert_eq!(s.current_valve_index(), origin);

        for _ in 0..3 {
            s.previous_valve();
        }
        assert_eq!(s.current_valve_index(), origin);
    }

    #[test]
    fn previous_at_zero_of_three_wraps_to_two() {
        let mut s = session(vec![valve("a"), valve("b"), valve("c")]);
        assert_eq!(s.current_valve_index(), 0);

        s.previous_valve();

        assert_eq!(s.current_valve_index(), 2);
    }

    #[test]
    fn navigation_is_noop_when_no_valves() {
        let mut s = session(vec![motor("m-1")]);
        s.next_valve();
        s.previous_valve();
        assert_eq!(s.current_valve_index(), 0);
        assert!(s.current_valve().is_none());
    }

    #[test]
    fn valve_position_is_one_based() {
        let mut s = session(vec![valve("a"), valve("b")]);
        assert_eq!(s.valve_position(), Some((1, 2)));
        s.next_valve();
        assert_eq!(s.valve_position(), Some((2, 2)));
    }

    #[test]
    fn select_valve_jumps_by_imei() {
        let mut s = session(vec![valve("a"), valve("b"), valve("c")]);
        s.select_valve("c").unwrap();
        assert_eq!(s.current_valve().unwrap().imei, "c");

        let err = s.select_valve("nope").unwrap_err();
        assert!(matches!(err, CoreError::ValveNotFound { .. }));
    }

    // ── Motor-follow rule ───────────────────────────────────────────

    #[test]
    fn motor_start_opens_default_valves_only() {
        // Worked end-to-end case: motor A, default valve B, plain valve C.
        let mut s = session(vec![motor("A"), default_valve("B"), valve("C")]);

        s.apply_motor_update(true, None);

        assert!(s.motor().unwrap().active);
        assert!(s.valve("B").unwrap().active);
        assert!(!s.valve("C").unwrap().active);
    }

    #[test]
    fn motor_stop_leaves_valves_untouched() {
        let mut s = session(vec![motor("A"), default_valve("B")]);
        s.apply_motor_update(true, None);
        assert!(s.valve("B").unwrap().active);

        s.apply_motor_update(false, None);

        assert!(!s.motor().unwrap().active);
        assert!(s.valve("B").unwrap().active, "follow rule is one-directional");
    }

    #[test]
    fn motor_schedule_applies_cascade_too() {
        let mut s = session(vec![motor("A"), default_valve("B")]);
        let window = ScheduleWindow::new(t("2024-03-10T08:30:00"), t("2024-03-10T10:00:00"));

        s.apply_motor_update(true, Some(window));

        let m = s.motor().unwrap();
        assert!(m.active);
        assert_eq!(m.reported_start, Some(window.start));
        assert!(s.valve("B").unwrap().active);
        assert_eq!(s.draft("A"), Some(window));
    }

    // ── Valve updates ───────────────────────────────────────────────

    #[test]
    fn valve_update_touches_only_matching_imei() {
        let mut s = session(vec![valve("a"), valve("b")]);

        s.apply_valve_update("b", true, None);

        assert!(!s.valve("a").unwrap().active);
        assert!(s.valve("b").unwrap().active);
    }

    #[test]
    fn valve_update_for_unknown_imei_is_absorbed() {
        let mut s = session(vec![valve("a")]);
        s.apply_valve_update("ghost", true, None);
        assert!(!s.valve("a").unwrap().active);
    }

    // ── Default valve ───────────────────────────────────────────────

    #[test]
    fn set_default_twice_leaves_exactly_second() {
        let mut s = session(vec![default_valve("x"), valve("y"), valve("z")]);

        s.apply_default_valve("y");
        s.apply_default_valve("z");

        let defaults: Vec<_> = s
            .valves()
            .iter()
            .filter(|v| v.default_valve)
            .map(|v| v.imei.as_str())
            .collect();
        assert_eq!(defaults, vec!["z"]);
    }

    // ── Drafts ──────────────────────────────────────────────────────

    #[test]
    fn drafts_seed_from_reported_times_or_now() {
        let mut scheduled = valve("gv-1");
        scheduled.reported_start = Some(t("2024-03-10T08:30:00"));
        scheduled.reported_stop = Some(t("2024-03-10T10:00:00"));

        let s = session(vec![scheduled, valve("gv-2")]);

        assert_eq!(
            s.draft("gv-1").unwrap(),
            ScheduleWindow::new(t("2024-03-10T08:30:00"), t("2024-03-10T10:00:00"))
        );
        assert_eq!(s.draft("gv-2").unwrap(), ScheduleWindow::at(now()));
    }

    #[test]
    fn draft_edits_are_local() {
        let mut s = session(vec![valve("gv-1")]);
        s.set_draft_start("gv-1", t("2024-06-01T05:00:00"));
        s.set_draft_stop("gv-1", t("2024-06-01T07:00:00"));

        let draft = s.draft("gv-1").unwrap();
        assert_eq!(draft.start, t("2024-06-01T05:00:00"));
        assert_eq!(draft.stop, t("2024-06-01T07:00:00"));
        // Reported state is untouched until a write succeeds.
        assert!(s.valve("gv-1").unwrap().reported_start.is_none());
    }

    // ── Refresh ─────────────────────────────────────────────────────

    #[test]
    fn refresh_preserves_selection_and_edited_drafts() {
        let mut s = session(vec![valve("a"), valve("b"), valve("c")]);
        s.select_valve("b").unwrap();
        s.set_draft_start("b", t("2024-06-01T05:00:00"));

        s.refresh_from(
            vec![valve("b"), valve("c")],
            MotorPolicy::FirstWins,
            now(),
        )
        .unwrap();

        assert_eq!(s.current_valve().unwrap().imei, "b");
        assert_eq!(s.draft("b").unwrap().start, t("2024-06-01T05:00:00"));
        assert!(s.draft("a").is_none(), "departed valve's draft dropped");
    }

    #[test]
    fn refresh_resets_selection_when_valve_departs() {
        let mut s = session(vec![valve("a"), valve("b")]);
        s.select_valve("b").unwrap();

        s.refresh_from(vec![valve("a")], MotorPolicy::FirstWins, now())
            .unwrap();

        assert_eq!(s.current_valve_index(), 0);
        assert_eq!(s.current_valve().unwrap().imei, "a");
    }
}
