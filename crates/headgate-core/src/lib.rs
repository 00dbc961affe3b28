//! Reactive data layer between `headgate-api` and UI consumers (CLI / TUI).
//!
//! This crate owns the business logic and domain model for the
//! headgate workspace:
//!
//! - **[`Controller`]** -- Central facade managing the full lifecycle:
//!   [`sign_in()`](Controller::sign_in) verifies credentials,
//!   [`connect()`](Controller::connect) fetches the device list and spawns
//!   background tasks for command processing and optional periodic refresh.
//!   [`Controller::oneshot()`](Controller::oneshot) provides a lightweight
//!   fire-and-forget mode for single CLI invocations.
//!
//! - **[`DeviceSession`]** -- Pure in-memory view over one account's
//!   controllers: the pump motor, the ordered gate-valve list, the valve
//!   carousel cursor, and per-device schedule drafts. Mutated only after
//!   the matching backend write succeeds ("await, then mutate"), so a
//!   failed write can never move local state.
//!
//! - **[`Command`]** -- Typed mutation requests routed through an `mpsc`
//!   channel to the controller's command processor, which applies them
//!   strictly one at a time.
//!
//! - **Domain model** ([`model`]) -- Canonical types ([`Device`],
//!   [`DeviceKind`], [`ScheduleWindow`]) decoded from the wire shapes in
//!   `headgate-api`.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandOutcome, MappingRequest, RegisterAccount};
pub use config::{BackendConfig, TlsVerification};
pub use controller::{Controller, Notice, NoticeLevel, SessionPhase};
pub use error::CoreError;
pub use session::{DeviceSession, MotorPolicy};

// Re-export model types at the crate root for ergonomics.
pub use model::{Device, DeviceKind, ScheduleWindow};
