// ── Controller abstraction ──
//
// Full lifecycle management for one account session: credential
// check, device fetch, command routing, and reactive session
// snapshots. Every backend write follows the same discipline: send
// the request, await the result, and only then mutate the session.
// A failed write leaves the session exactly as it was.

use std::sync::Arc;

use chrono::Local;
use secrecy::SecretString;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use headgate_api::ApiClient;
use headgate_api::transport::{TlsMode, TransportConfig};
use headgate_api::types::DeviceMapping;

use crate::command::{Command, CommandEnvelope, CommandOutcome, MappingRequest, RegisterAccount};
use crate::config::{BackendConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::Device;
use crate::session::DeviceSession;

const COMMAND_CHANNEL_SIZE: usize = 16;
const NOTICE_CHANNEL_SIZE: usize = 64;

// ── SessionPhase ─────────────────────────────────────────────────

/// Session lifecycle phase observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    LoggedOut,
    Authenticating,
    Loading,
    Ready,
    Failed,
}

// ── Notices ──────────────────────────────────────────────────────

/// User-facing notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient user-facing notification. Operations surface these as
/// a side channel; their `Result` stays the machine-readable truth.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the session
/// state, the command channel, and the background tasks. One
/// controller serves one account at a time; signing out and back in
/// rebuilds the channel and tasks.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: BackendConfig,
    api: ApiClient,
    /// Authoritative session state. Mutated only by appliers after a
    /// confirmed backend write, or by local-only operations.
    session: Mutex<DeviceSession>,
    /// Cloned snapshots for UI consumers, refreshed on every mutation.
    session_view: watch::Sender<Arc<DeviceSession>>,
    phase: watch::Sender<SessionPhase>,
    notice_tx: broadcast::Sender<Notice>,
    /// Present while signed in; `None` routes `execute` to `NotLoggedIn`.
    command_tx: Mutex<Option<mpsc::Sender<CommandEnvelope>>>,
    cancel: CancellationToken,
    /// Child token for the current sign-in -- cancelled on sign-out,
    /// replaced on the next sign-in.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller from configuration. Performs no network
    /// traffic -- call [`sign_in`](Self::sign_in) or
    /// [`resume`](Self::resume), then [`connect`](Self::connect).
    pub fn new(config: BackendConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let api = ApiClient::new(config.base_url.clone(), &transport)?;

        let (session_view, _) = watch::channel(Arc::new(DeviceSession::default()));
        let (phase, _) = watch::channel(SessionPhase::LoggedOut);
        let (notice_tx, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                api,
                session: Mutex::new(DeviceSession::default()),
                session_view,
                phase,
                notice_tx,
                command_tx: Mutex::new(None),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Access the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    // ── Authentication ───────────────────────────────────────────

    /// Verify credentials with the backend.
    ///
    /// On success the session identity is set, but no devices are
    /// loaded yet -- callers persist the session and then
    /// [`connect`](Self::connect). Does not persist anything itself.
    pub async fn sign_in(&self, user_name: &str, password: &SecretString) -> Result<(), CoreError> {
        self.inner.phase.send_replace(SessionPhase::Authenticating);

        if let Err(e) = self.inner.api.login(user_name, password).await {
            self.inner.phase.send_replace(SessionPhase::LoggedOut);
            return Err(e.into());
        }

        self.adopt_user(user_name).await;
        info!(user_name, "signed in");
        Ok(())
    }

    /// Adopt a previously persisted session without a credential
    /// check. The stored user name is the whole session, so there is
    /// nothing to verify until the first fetch.
    pub async fn resume(&self, user_name: &str) -> Result<(), CoreError> {
        if user_name.trim().is_empty() {
            return Err(CoreError::NotLoggedIn);
        }
        self.adopt_user(user_name).await;
        debug!(user_name, "resumed stored session");
        Ok(())
    }

    async fn adopt_user(&self, user_name: &str) {
        let mut session = self.inner.session.lock().await;
        *session = DeviceSession::for_user(user_name);
        publish(&self.inner, &session);
    }

    /// Create a new account. Never signs the account in; callers go
    /// through [`sign_in`](Self::sign_in) afterwards, mirroring the
    /// backend's own flow.
    pub async fn register(&self, account: &RegisterAccount) -> Result<(), CoreError> {
        account.validate()?;
        self.inner.api.register(&account.to_wire()).await?;
        Ok(())
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Load the device list and spawn background tasks (command
    /// processor, optional periodic refresh).
    ///
    /// The command processor starts before the initial fetch, so a
    /// failed first load (phase `Failed`) can still be retried with
    /// [`Command::Refresh`].
    pub async fn connect(&self) -> Result<(), CoreError> {
        {
            let session = self.inner.session.lock().await;
            if session.user_name().is_empty() {
                return Err(CoreError::NotLoggedIn);
            }
        }

        // Fresh child token and channel for this sign-in.
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        *self.inner.command_tx.lock().await = Some(command_tx);

        let mut handles = self.inner.task_handles.lock().await;
        let ctrl = self.clone();
        handles.push(tokio::spawn(command_processor_task(
            ctrl,
            command_rx,
            child.clone(),
        )));

        let interval_secs = self.inner.config.refresh_interval_secs;
        if interval_secs > 0 {
            let ctrl = self.clone();
            handles.push(tokio::spawn(refresh_task(ctrl, interval_secs, child)));
        }
        drop(handles);

        refresh_inner(self).await.map(|_| ())
    }

    /// Tear down the signed-in state: stop tasks, drop the command
    /// channel, reset the session. Persisted session cleanup is the
    /// caller's job.
    pub async fn sign_out(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            handle.abort();
        }
        drop(handles);

        *self.inner.command_tx.lock().await = None;

        let mut session = self.inner.session.lock().await;
        *session = DeviceSession::default();
        publish(&self.inner, &session);
        drop(session);

        self.inner.phase.send_replace(SessionPhase::LoggedOut);
        info!("signed out");
    }

    /// Stop everything for process exit.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            handle.abort();
        }
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command, awaiting its result.
    ///
    /// Commands are processed one at a time in submission order, so
    /// two rapid writes can never interleave their await-then-mutate
    /// sequences.
    pub async fn execute(&self, cmd: Command) -> Result<CommandOutcome, CoreError> {
        let command_tx = {
            let guard = self.inner.command_tx.lock().await;
            guard.clone().ok_or(CoreError::NotLoggedIn)?
        };

        let (tx, rx) = oneshot::channel();
        command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::SessionClosed)?;

        rx.await.map_err(|_| CoreError::SessionClosed)?
    }

    /// Re-fetch the device list now.
    pub async fn refresh(&self) -> Result<CommandOutcome, CoreError> {
        self.execute(Command::Refresh).await
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: resume a stored session, connect, run the closure,
    /// shut down. Optimized for single CLI invocations -- periodic
    /// refresh is disabled regardless of configuration.
    pub async fn oneshot<F, Fut, T>(
        config: BackendConfig,
        user_name: &str,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.refresh_interval_secs = 0;

        let controller = Controller::new(cfg)?;
        controller.resume(user_name).await?;
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to session snapshots.
    pub fn session(&self) -> watch::Receiver<Arc<DeviceSession>> {
        self.inner.session_view.subscribe()
    }

    /// The current session snapshot.
    pub fn session_snapshot(&self) -> Arc<DeviceSession> {
        self.inner.session_view.borrow().clone()
    }

    /// Subscribe to session phase changes.
    pub fn phase(&self) -> watch::Receiver<SessionPhase> {
        self.inner.phase.subscribe()
    }

    /// Subscribe to the notification side channel.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notice_tx.subscribe()
    }

    // ── Local-only session operations ────────────────────────────
    //
    // Carousel moves and draft edits never touch the backend, so
    // they mutate immediately.

    pub async fn next_valve(&self) {
        let mut session = self.inner.session.lock().await;
        session.next_valve();
        publish(&self.inner, &session);
    }

    pub async fn previous_valve(&self) {
        let mut session = self.inner.session.lock().await;
        session.previous_valve();
        publish(&self.inner, &session);
    }

    pub async fn select_valve(&self, imei: &str) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;
        session.select_valve(imei)?;
        publish(&self.inner, &session);
        Ok(())
    }

    pub async fn set_draft_start(&self, imei: &str, start: chrono::NaiveDateTime) {
        let mut session = self.inner.session.lock().await;
        session.set_draft_start(imei, start);
        publish(&self.inner, &session);
    }

    pub async fn set_draft_stop(&self, imei: &str, stop: chrono::NaiveDateTime) {
        let mut session = self.inner.session.lock().await;
        session.set_draft_stop(imei, stop);
        publish(&self.inner, &session);
    }

    fn notify(&self, notice: Notice) {
        let _ = self.inner.notice_tx.send(notice);
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &BackendConfig) -> TransportConfig {
    let tls = match &config.tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    };
    TransportConfig {
        tls,
        timeout: config.timeout,
    }
}

/// Publish a snapshot of the session to watchers. Call with the
/// session lock held so snapshots are ordered like the mutations.
fn publish(inner: &ControllerInner, session: &DeviceSession) {
    inner.session_view.send_replace(Arc::new(session.clone()));
}

/// Fetch the device list and rebuild the session from it.
///
/// Phase handling: during a first load the phase passes through
/// `Loading`; once `Ready`, background refreshes stay `Ready` so the
/// UI never flickers back to a spinner.
async fn refresh_inner(controller: &Controller) -> Result<usize, CoreError> {
    let inner = &controller.inner;

    let was_ready = *inner.phase.borrow() == SessionPhase::Ready;
    if !was_ready {
        inner.phase.send_replace(SessionPhase::Loading);
    }

    let user_name = inner.session.lock().await.user_name().to_owned();

    let live = match inner.api.user_devices(&user_name).await {
        Ok(live) => live,
        Err(e) => {
            if !was_ready {
                inner.phase.send_replace(SessionPhase::Failed);
            }
            controller.notify(Notice::error("Failed to fetch device data"));
            return Err(e.into());
        }
    };

    let devices: Vec<Device> = live.iter().map(Device::from_wire).collect();
    let count = devices.len();

    let mut session = inner.session.lock().await;
    if let Err(e) = session.refresh_from(devices, inner.config.motor_policy, Local::now().naive_local())
    {
        drop(session);
        if !was_ready {
            inner.phase.send_replace(SessionPhase::Failed);
        }
        return Err(e);
    }
    publish(inner, &session);
    drop(session);

    inner.phase.send_replace(SessionPhase::Ready);
    debug!(device_count = count, "device list refreshed");
    Ok(count)
}

// ── Background tasks ─────────────────────────────────────────────

async fn refresh_task(controller: Controller, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = refresh_inner(&controller).await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

/// Process commands from the mpsc channel, one at a time.
async fn command_processor_task(
    controller: Controller,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

/// Route a command to its API call, applying the session mutation
/// only after the call succeeds.
async fn route_command(
    controller: &Controller,
    cmd: Command,
) -> Result<CommandOutcome, CoreError> {
    let inner = &controller.inner;

    match cmd {
        // ── Motor operations ─────────────────────────────────────
        Command::StartMotor => {
            let motor = require_motor(controller).await?;
            if let Err(e) = inner.api.upsert_device_live(&motor.status_upsert(true)).await {
                controller.notify(Notice::error("Failed to update device data"));
                return Err(e.into());
            }

            let mut session = inner.session.lock().await;
            session.apply_motor_update(true, None);
            publish(inner, &session);
            drop(session);

            controller.notify(Notice::success("Device data updated successfully!"));
            Ok(CommandOutcome::Ok)
        }

        Command::StopMotor => {
            let motor = require_motor(controller).await?;
            if let Err(e) = inner.api.upsert_device_live(&motor.status_upsert(false)).await {
                controller.notify(Notice::error("Failed to update device data"));
                return Err(e.into());
            }

            let mut session = inner.session.lock().await;
            session.apply_motor_update(false, None);
            publish(inner, &session);
            drop(session);

            controller.notify(Notice::success("Device data updated successfully!"));
            Ok(CommandOutcome::Ok)
        }

        Command::ScheduleMotor { window } => {
            let motor = require_motor(controller).await?;
            if let Err(e) = inner
                .api
                .upsert_device_live(&motor.schedule_upsert(window))
                .await
            {
                controller.notify(Notice::error("Failed to update device data"));
                return Err(e.into());
            }

            let mut session = inner.session.lock().await;
            session.apply_motor_update(true, Some(window));
            publish(inner, &session);
            drop(session);

            controller.notify(Notice::success("Device data updated successfully!"));
            Ok(CommandOutcome::Ok)
        }

        // ── Valve operations ─────────────────────────────────────
        Command::StartValve { imei } => {
            valve_status_command(controller, &imei, true).await
        }

        Command::StopValve { imei } => {
            valve_status_command(controller, &imei, false).await
        }

        Command::ScheduleValve { imei, window } => {
            let valve = require_valve(controller, &imei).await?;
            if let Err(e) = inner
                .api
                .upsert_device_live(&valve.schedule_upsert(window))
                .await
            {
                controller.notify(Notice::error("Failed to update device data"));
                return Err(e.into());
            }

            let mut session = inner.session.lock().await;
            session.apply_valve_update(&imei, true, Some(window));
            publish(inner, &session);
            drop(session);

            controller.notify(Notice::success("Device data updated successfully!"));
            Ok(CommandOutcome::Ok)
        }

        Command::SetDefaultValve { imei } => {
            require_valve(controller, &imei).await?;
            if let Err(e) = inner.api.update_default_gv(&imei).await {
                controller.notify(Notice::error("Failed to update default gate valve"));
                return Err(e.into());
            }

            let mut session = inner.session.lock().await;
            session.apply_default_valve(&imei);
            publish(inner, &session);
            drop(session);

            controller.notify(Notice::success("Default Gate Valve Updated"));
            Ok(CommandOutcome::Ok)
        }

        // ── Account operations ───────────────────────────────────
        Command::RegisterMapping(request) => {
            request.validate()?;

            let user_name = inner.session.lock().await.user_name().to_owned();
            let mapping = to_wire_mapping(&user_name, &request);
            if let Err(e) = inner.api.upsert_mapping(&mapping).await {
                controller.notify(Notice::error("Failed to register device mapping"));
                return Err(e.into());
            }
            controller.notify(Notice::success("Device mapping registered"));

            // The device list just changed shape; pick it up, but a
            // refetch hiccup does not undo the successful mapping.
            if let Err(e) = refresh_inner(controller).await {
                warn!(error = %e, "post-mapping refresh failed");
            }
            Ok(CommandOutcome::Ok)
        }

        // ── Data ─────────────────────────────────────────────────
        Command::Refresh => {
            let device_count = refresh_inner(controller).await?;
            Ok(CommandOutcome::Refreshed { device_count })
        }
    }
}

/// Shared start/stop path for valves.
async fn valve_status_command(
    controller: &Controller,
    imei: &str,
    active: bool,
) -> Result<CommandOutcome, CoreError> {
    let inner = &controller.inner;

    let valve = require_valve(controller, imei).await?;
    if let Err(e) = inner.api.upsert_device_live(&valve.status_upsert(active)).await {
        controller.notify(Notice::error("Failed to update device data"));
        return Err(e.into());
    }

    let mut session = inner.session.lock().await;
    session.apply_valve_update(imei, active, None);
    publish(inner, &session);
    drop(session);

    controller.notify(Notice::success("Device data updated successfully!"));
    Ok(CommandOutcome::Ok)
}

/// Clone the session's motor, or fail before any network traffic.
async fn require_motor(controller: &Controller) -> Result<Device, CoreError> {
    controller
        .inner
        .session
        .lock()
        .await
        .motor()
        .cloned()
        .ok_or(CoreError::NoMotor)
}

/// Clone a valve by IMEI, or fail before any network traffic.
async fn require_valve(controller: &Controller, imei: &str) -> Result<Device, CoreError> {
    controller.inner.session.lock().await.valve(imei).cloned()
}

fn to_wire_mapping(user_name: &str, request: &MappingRequest) -> DeviceMapping {
    DeviceMapping {
        user_name: user_name.to_owned(),
        tp_imei: request.motor_imei.clone(),
        gv_imei: request.valve_imei.clone(),
        tp_active: request.motor_active,
        gv_active: request.valve_active,
        default_gv: request.default_valve,
    }
}
