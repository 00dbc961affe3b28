//! Application core -- event loop, screen management, action dispatch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Tabs},
};
use secrecy::SecretString;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use headgate_config::{SessionStore, StoredSession};
use headgate_core::{Command, Controller, RegisterAccount, SessionPhase};

use crate::action::{Action, Notification, NotificationLevel};
use crate::component::Component;
use crate::data_bridge::spawn_data_bridge;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::theme;
use crate::tui::Tui;

/// Connection status as seen by the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionStatus {
    fn from_phase(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::LoggedOut => Self::Disconnected,
            SessionPhase::Authenticating | SessionPhase::Loading => Self::Connecting,
            SessionPhase::Ready => Self::Connected,
            SessionPhase::Failed => Self::Failed,
        }
    }
}

/// Top-level application state and event loop.
pub struct App {
    /// Current active screen.
    active_screen: ScreenId,
    /// Previous screen for GoBack.
    previous_screen: Option<ScreenId>,
    /// All screen components, keyed by ScreenId.
    screens: HashMap<ScreenId, Box<dyn Component>>,
    /// Whether the app should keep running.
    running: bool,
    /// Connection status indicator.
    connection_status: ConnectionStatus,
    /// Help overlay visibility.
    help_visible: bool,
    /// Action sender -- components can dispatch actions through this.
    action_tx: mpsc::UnboundedSender<Action>,
    /// Action receiver -- main loop drains this.
    action_rx: mpsc::UnboundedReceiver<Action>,
    controller: Controller,
    /// On-disk session marker; written on sign-in, removed on sign-out.
    session_store: SessionStore,
    /// Signed-in user name, shown in the status bar.
    user: Option<String>,
    /// Stored user to resume at startup, if any.
    resume_user: Option<String>,
    /// Cancellation token for the data bridge task.
    data_cancel: CancellationToken,
    /// Active notification toast with display timestamp.
    notification: Option<(Notification, Instant)>,
}

impl App {
    /// Create the App with all screens. A stored session (`resume_user`)
    /// routes straight to the dashboard while the resume runs in the
    /// background; otherwise the sign-in screen comes up first.
    pub fn new(
        controller: Controller,
        session_store: SessionStore,
        backend_label: String,
        prefill_user: Option<String>,
        resume_user: Option<String>,
    ) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let screens: HashMap<ScreenId, Box<dyn Component>> =
            create_screens(backend_label, prefill_user).into_iter().collect();

        let active_screen = if resume_user.is_some() {
            ScreenId::Dashboard
        } else {
            ScreenId::SignIn
        };

        Self {
            active_screen,
            previous_screen: None,
            screens,
            running: true,
            connection_status: ConnectionStatus::default(),
            help_visible: false,
            action_tx,
            action_rx,
            controller,
            session_store,
            user: None,
            resume_user,
            data_cancel: CancellationToken::new(),
            notification: None,
        }
    }

    /// Initialize all screen components with the action sender.
    fn init_screens(&mut self) -> Result<()> {
        for screen in self.screens.values_mut() {
            screen.init(self.action_tx.clone())?;
        }
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
        Ok(())
    }

    /// Run the main event loop. This is the heart of the TUI.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.init_screens()?;

        if let Some(user) = self.resume_user.take() {
            self.connection_status = ConnectionStatus::Connecting;
            self.spawn_resume(user);
        }

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            // 1. Wait for the next event
            let Some(event) = events.next().await else {
                break;
            };

            // 2. Map event to action(s)
            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(action) = self.handle_mouse_event(mouse)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => {
                    self.action_tx.send(Action::Resize(w, h))?;
                }
                Event::Tick => {
                    self.action_tx.send(Action::Tick)?;
                }
                Event::Render => {
                    self.action_tx.send(Action::Render)?;
                }
            }

            // 3. Drain and process all queued actions
            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.data_cancel.cancel();
        events.stop();
        self.controller.shutdown().await;
        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action. Global keys are handled here;
    /// screen-specific keys are delegated to the active screen.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        if self.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        // While a screen is consuming typed text (auth forms, the
        // mapping form, an open schedule editor), it owns the keyboard.
        let captures = self
            .screens
            .get(&self.active_screen)
            .is_some_and(|screen| screen.wants_text_input());
        if captures {
            if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                return screen.handle_key_event(key);
            }
            return Ok(None);
        }

        // Global keybindings
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),

            // Screen navigation via number keys
            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='2')) => {
                let n = c as u8 - b'0';
                if let Some(screen) = ScreenId::from_number(n) {
                    return Ok(Some(Action::SwitchScreen(screen)));
                }
            }

            // Tab / Shift+Tab for screen cycling
            (KeyModifiers::NONE, KeyCode::Tab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }
            (KeyModifiers::SHIFT, KeyCode::BackTab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
            }

            (KeyModifiers::NONE, KeyCode::Esc) => return Ok(Some(Action::GoBack)),

            _ => {}
        }

        // Delegate to the active screen component
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }

        Ok(None)
    }

    /// Handle mouse events (delegate to active screen).
    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_mouse_event(mouse);
        }
        Ok(None)
    }

    /// Process a single action: update app state and propagate to
    /// screen components.
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => {
                self.running = false;
            }

            Action::Render | Action::Resize(..) => {}

            Action::SwitchScreen(target) => {
                if *target != self.active_screen {
                    debug!("switching screen: {} -> {}", self.active_screen, target);
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(false);
                    }
                    self.previous_screen = Some(self.active_screen);
                    self.active_screen = *target;
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(true);
                    }
                }
            }

            Action::GoBack => {
                // Never "back" into the logged-out screens; those are
                // only reached through the auth flow itself.
                if let Some(prev) = self.previous_screen.take() {
                    if !prev.is_auth() {
                        self.action_tx.send(Action::SwitchScreen(prev))?;
                    }
                }
            }

            Action::ToggleHelp => {
                self.help_visible = !self.help_visible;
            }

            Action::Tick => {
                // Auto-dismiss notifications after 3 seconds
                if let Some((_, created)) = &self.notification {
                    if created.elapsed() > Duration::from_secs(3) {
                        self.notification = None;
                    }
                }
                // Forward ticks to the active screen for throbber animation
                if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                    let _ = screen.update(action);
                }
            }

            // ── Auth flow ────────────────────────────────────────────

            Action::SignInSubmitted { user, password } => {
                self.connection_status = ConnectionStatus::Connecting;
                self.spawn_sign_in(user.clone(), password.clone());
            }

            Action::SignInResult(result) => {
                match result {
                    Ok(user) => self.complete_sign_in(user.clone()),
                    Err(message) => {
                        warn!(error = %message, "sign-in failed");
                        self.connection_status = ConnectionStatus::Disconnected;
                        // Resume failures start on the dashboard; route
                        // back to the sign-in form.
                        if self.active_screen != ScreenId::SignIn {
                            self.action_tx
                                .send(Action::Notify(Notification::error(message.clone())))?;
                            self.action_tx
                                .send(Action::SwitchScreen(ScreenId::SignIn))?;
                        }
                    }
                }
                self.broadcast(action)?;
            }

            Action::RegisterSubmitted(account) => {
                self.spawn_register((**account).clone());
            }

            Action::RegisterResult(result) => {
                if let Ok(user) = result {
                    info!(user = %user, "account registered");
                    self.action_tx.send(Action::Notify(Notification::success(
                        "Account created, sign in to continue",
                    )))?;
                    self.action_tx.send(Action::SwitchScreen(ScreenId::SignIn))?;
                }
                self.broadcast(action)?;
            }

            Action::SignOut => {
                self.data_cancel.cancel();
                self.data_cancel = CancellationToken::new();
                let controller = self.controller.clone();
                tokio::spawn(async move {
                    controller.sign_out().await;
                });
                if let Err(e) = self.session_store.clear() {
                    warn!(error = %e, "failed to clear stored session");
                }
                self.user = None;
                self.connection_status = ConnectionStatus::Disconnected;
                self.broadcast(action)?;
                self.action_tx
                    .send(Action::Notify(Notification::info("Signed out")))?;
                self.action_tx.send(Action::SwitchScreen(ScreenId::SignIn))?;
            }

            // ── Session data: all screens stay in sync ──────────────

            Action::PhaseChanged(phase) => {
                self.connection_status = ConnectionStatus::from_phase(*phase);
                self.broadcast(action)?;
            }

            Action::SessionUpdated(_) => {
                self.broadcast(action)?;
            }

            // ── Command pipeline ────────────────────────────────────

            Action::Run(command) => {
                self.execute_command(command.clone());
            }

            Action::NextValve => {
                let controller = self.controller.clone();
                tokio::spawn(async move {
                    controller.next_valve().await;
                });
            }

            Action::PreviousValve => {
                let controller = self.controller.clone();
                tokio::spawn(async move {
                    controller.previous_valve().await;
                });
            }

            Action::DraftStartChanged { imei, start } => {
                let controller = self.controller.clone();
                let imei = imei.clone();
                let start = *start;
                tokio::spawn(async move {
                    controller.set_draft_start(&imei, start).await;
                });
            }

            Action::DraftStopChanged { imei, stop } => {
                let controller = self.controller.clone();
                let imei = imei.clone();
                let stop = *stop;
                tokio::spawn(async move {
                    controller.set_draft_stop(&imei, stop).await;
                });
            }

            // Notifications
            Action::Notify(notification) => {
                self.notification = Some((notification.clone(), Instant::now()));
                // The pending latches on the dashboard and mapping
                // screens clear on any notification.
                self.broadcast(action)?;
            }
        }

        Ok(())
    }

    /// Forward an action to every screen, dispatching any follow-ups.
    fn broadcast(&mut self, action: &Action) -> Result<()> {
        for screen in self.screens.values_mut() {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    // ── Auth tasks ────────────────────────────────────────────────

    fn spawn_sign_in(&self, user: String, password: SecretString) {
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = async {
                controller.sign_in(&user, &password).await?;
                controller.connect().await
            }
            .await;
            let action = match result {
                Ok(()) => Action::SignInResult(Ok(user)),
                Err(e) => Action::SignInResult(Err(e.to_string())),
            };
            let _ = tx.send(action);
        });
    }

    fn spawn_resume(&self, user: String) {
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = async {
                controller.resume(&user).await?;
                controller.connect().await
            }
            .await;
            let action = match result {
                Ok(()) => Action::SignInResult(Ok(user)),
                Err(e) => Action::SignInResult(Err(e.to_string())),
            };
            let _ = tx.send(action);
        });
    }

    fn spawn_register(&self, account: RegisterAccount) {
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let user = account.user_name.clone();
            let action = match controller.register(&account).await {
                Ok(()) => Action::RegisterResult(Ok(user)),
                Err(e) => Action::RegisterResult(Err(e.to_string())),
            };
            let _ = tx.send(action);
        });
    }

    /// Sign-in (or resume) succeeded: persist the session, start the
    /// data bridge, land on the dashboard.
    fn complete_sign_in(&mut self, user: String) {
        // The stored marker is what makes the session durable; if it
        // cannot be written, the user is not signed in.
        if let Err(e) = self.session_store.save(&StoredSession::new(user.clone())) {
            warn!(error = %e, "failed to persist session");
            let _ = self.action_tx.send(Action::Notify(Notification::error(format!(
                "Could not save the session: {e}"
            ))));
            let controller = self.controller.clone();
            tokio::spawn(async move {
                controller.sign_out().await;
            });
            self.connection_status = ConnectionStatus::Disconnected;
            return;
        }

        info!(user = %user, "signed in");
        self.user = Some(user);
        self.start_data_bridge();
        let _ = self.action_tx.send(Action::SwitchScreen(ScreenId::Dashboard));
    }

    fn start_data_bridge(&mut self) {
        self.data_cancel.cancel();
        self.data_cancel = CancellationToken::new();
        let controller = self.controller.clone();
        let cancel = self.data_cancel.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            spawn_data_bridge(controller, tx, cancel).await;
        });
    }

    // ── Command execution ─────────────────────────────────────────

    /// Spawn a command execution task. Success and failure notices
    /// arrive through the data bridge; only errors raised before the
    /// command reaches the processor are toasted here.
    fn execute_command(&self, command: Command) {
        let controller = self.controller.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = controller.execute(command).await {
                warn!(error = %e, "command execution failed");
                let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
            }
        });
    }

    // ── Rendering ─────────────────────────────────────────────────

    /// Render the full application frame.
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // Auth screens get the full frame, no tab bar or status bar
        if self.active_screen.is_auth() {
            if let Some(screen) = self.screens.get(&self.active_screen) {
                screen.render(frame, area);
            }
            if let Some((notification, _)) = &self.notification {
                self.render_notification(frame, area, notification);
            }
            return;
        }

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            area,
        );

        // Layout: [screen content] [tab bar] [status bar]
        let layout = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, layout[0]);
        }

        self.render_tab_bar(frame, layout[1]);
        self.render_status_bar(frame, layout[2]);

        // Overlays on top (order matters: last = topmost)
        if let Some((notification, _)) = &self.notification {
            self.render_notification(frame, area, notification);
        }

        if self.help_visible {
            self.render_help_overlay(frame, area);
        }
    }

    /// Render the tab bar.
    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::TABS
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                Line::from(Span::styled(
                    format!(" {} {} ", id.number(), id.label()),
                    style,
                ))
            })
            .collect();

        let tabs = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(
                ScreenId::TABS
                    .iter()
                    .position(|&s| s == self.active_screen)
                    .unwrap_or(0),
            );

        frame.render_widget(tabs, area);
    }

    /// Render the bottom status bar: connection state, user, key hints.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let connection_indicator = match self.connection_status {
            ConnectionStatus::Connected => {
                Span::styled("\u{25CF} connected", Style::default().fg(theme::SUCCESS_GREEN))
            }
            ConnectionStatus::Disconnected => {
                Span::styled("\u{25CB} signed out", Style::default().fg(theme::ERROR_RED))
            }
            ConnectionStatus::Connecting => Span::styled(
                "\u{25D0} connecting",
                Style::default().fg(theme::ELECTRIC_YELLOW),
            ),
            ConnectionStatus::Failed => {
                Span::styled("\u{2717} failed", Style::default().fg(theme::ERROR_RED))
            }
        };

        let mut spans = vec![Span::raw(" "), connection_indicator];
        if let Some(user) = &self.user {
            spans.push(Span::styled(
                format!(" \u{2502} {user}"),
                Style::default().fg(theme::DIM_WHITE),
            ));
        }
        spans.push(Span::styled(
            " \u{2502} ? help  q quit",
            theme::key_hint(),
        ));

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    /// Render the help overlay centered on screen.
    #[allow(clippy::unused_self)]
    fn render_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let help_width = 58u16.min(area.width.saturating_sub(4));
        let help_height = 21u16.min(area.height.saturating_sub(4));

        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;
        let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            help_area,
        );

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let section = |label: &'static str| {
            Line::from(Span::styled(
                format!("  {label}"),
                Style::default().fg(theme::NEON_CYAN),
            ))
        };
        let entry = |key: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
                Span::styled(what, theme::key_hint()),
            ])
        };

        let help_text = vec![
            Line::from(""),
            section("Navigation"),
            entry("1-2", "Jump to screen"),
            entry("Tab", "Next screen"),
            entry("Esc", "Back / close"),
            Line::from(""),
            section("Dashboard"),
            entry("\u{25B4}\u{25BE} k/j", "Motor / valve panel"),
            entry("\u{25C2}\u{25B8} h/l", "Previous / next valve"),
            entry("s / x", "Start / stop device"),
            entry("e", "Edit schedule"),
            entry("d", "Make valve the default"),
            entry("r", "Refresh device data"),
            entry("L", "Sign out"),
            Line::from(""),
            section("Global"),
            entry("?", "Toggle this help"),
            entry("q", "Quit"),
            entry("Ctrl+C", "Quit from anywhere"),
        ];
        frame.render_widget(Paragraph::new(help_text), inner);
    }

    /// Render a notification toast in the bottom-right corner.
    #[allow(clippy::unused_self)]
    fn render_notification(&self, frame: &mut Frame, area: Rect, notification: &Notification) {
        let msg_len = u16::try_from(notification.message.len()).unwrap_or(u16::MAX);
        let width = (msg_len + 6).clamp(20, 60).min(area.width);
        let height = 3u16;

        let x = area.width.saturating_sub(width + 1);
        let y = area.height.saturating_sub(height + 2); // above status bar
        let toast_area = Rect::new(area.x + x, area.y + y, width, height);

        let (border_color, icon) = match notification.level {
            NotificationLevel::Success => (theme::SUCCESS_GREEN, "\u{2713}"),
            NotificationLevel::Error => (theme::ERROR_RED, "\u{2717}"),
            NotificationLevel::Info => (theme::NEON_CYAN, "\u{B7}"),
        };

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            toast_area,
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color));

        let inner = block.inner(toast_area);
        frame.render_widget(block, toast_area);

        let line = Line::from(vec![
            Span::styled(format!(" {icon} "), Style::default().fg(border_color)),
            Span::styled(&notification.message, Style::default().fg(theme::DIM_WHITE)),
        ]);
        frame.render_widget(Paragraph::new(line), inner);
    }
}
