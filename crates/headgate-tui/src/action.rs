//! All possible UI actions. Actions are the sole mechanism for state
//! mutation: terminal events and controller updates both funnel into
//! the same queue, so every transition is serialized through one loop.

use std::sync::Arc;

use chrono::NaiveDateTime;
use secrecy::SecretString;

use headgate_core::{Command, DeviceSession, Notice, NoticeLevel, RegisterAccount, SessionPhase};

use crate::screen::ScreenId;

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A toast notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }

    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }
}

impl From<&Notice> for Notification {
    fn from(notice: &Notice) -> Self {
        let level = match notice.level {
            NoticeLevel::Info => NotificationLevel::Info,
            NoticeLevel::Success => NotificationLevel::Success,
            NoticeLevel::Error => NotificationLevel::Error,
        };
        Self {
            message: notice.message.clone(),
            level,
        }
    }
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    GoBack,
    ToggleHelp,

    // ── Auth flow ─────────────────────────────────────────────────
    SignInSubmitted { user: String, password: SecretString },
    /// Outcome of a sign-in attempt; `Ok` carries the user name.
    SignInResult(Result<String, String>),
    RegisterSubmitted(Box<RegisterAccount>),
    /// Outcome of a registration attempt; `Ok` carries the user name.
    RegisterResult(Result<String, String>),
    SignOut,

    // ── Session data (from the data bridge) ───────────────────────
    SessionUpdated(Arc<DeviceSession>),
    PhaseChanged(SessionPhase),

    // ── Device commands ───────────────────────────────────────────
    Run(Command),
    NextValve,
    PreviousValve,
    DraftStartChanged { imei: String, start: NaiveDateTime },
    DraftStopChanged { imei: String, stop: NaiveDateTime },

    // ── Notifications ─────────────────────────────────────────────
    Notify(Notification),
}
