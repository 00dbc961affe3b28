//! Dashboard screen: live state of the pump motor and the gate-valve
//! carousel, plus start/stop/schedule controls.
//!
//! Commands are dispatched through the app loop and resolve
//! asynchronously; a pending latch keeps the user from stacking
//! duplicate requests while one is in flight.

use chrono::{Local, NaiveDateTime, NaiveTime};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use std::sync::Arc;
use std::time::Duration;
use throbber_widgets_tui::{Throbber, ThrobberState};

use headgate_core::{Command, Device, DeviceSession, ScheduleWindow, SessionPhase};

use crate::action::{Action, Notification};
use crate::component::Component;
use crate::theme;
use crate::widgets::form;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelFocus {
    Motor,
    Valves,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditorField {
    Start,
    Stop,
    Set,
}

/// Modal schedule editor for one device.
struct ScheduleEditor {
    imei: String,
    is_motor: bool,
    start_input: String,
    stop_input: String,
    field: EditorField,
    error: Option<String>,
}

impl ScheduleEditor {
    fn open(device: &Device, is_motor: bool, draft: Option<ScheduleWindow>) -> Self {
        let (start_input, stop_input) = match draft {
            Some(window) => (fmt_dt(window.start), fmt_dt(window.stop)),
            None => (String::new(), String::new()),
        };
        Self {
            imei: device.imei.clone(),
            is_motor,
            start_input,
            stop_input,
            field: EditorField::Start,
            error: None,
        }
    }

    fn active_input_mut(&mut self) -> Option<&mut String> {
        match self.field {
            EditorField::Start => Some(&mut self.start_input),
            EditorField::Stop => Some(&mut self.stop_input),
            EditorField::Set => None,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            EditorField::Start => EditorField::Stop,
            EditorField::Stop => EditorField::Set,
            EditorField::Set => EditorField::Start,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            EditorField::Start => EditorField::Set,
            EditorField::Stop => EditorField::Start,
            EditorField::Set => EditorField::Stop,
        };
    }
}

/// The main monitoring and control screen.
pub struct DashboardScreen {
    session: Arc<DeviceSession>,
    phase: SessionPhase,
    focus: PanelFocus,
    editor: Option<ScheduleEditor>,
    /// A command is in flight; cleared when the session refreshes or a
    /// notification lands.
    pending: bool,
    throbber_state: ThrobberState,
}

impl DashboardScreen {
    pub fn new() -> Self {
        Self {
            session: Arc::new(DeviceSession::default()),
            phase: SessionPhase::LoggedOut,
            focus: PanelFocus::Motor,
            editor: None,
            pending: false,
            throbber_state: ThrobberState::default(),
        }
    }

    fn focused_device(&self) -> Option<&Device> {
        match self.focus {
            PanelFocus::Motor => self.session.motor(),
            PanelFocus::Valves => self.session.current_valve(),
        }
    }

    fn missing_device_notice(&self) -> Action {
        let what = match self.focus {
            PanelFocus::Motor => "No motor mapped",
            PanelFocus::Valves => "No gate valves mapped",
        };
        Action::Notify(Notification::info(format!(
            "{what}; press 2 to register a device mapping"
        )))
    }

    fn start_focused(&mut self) -> Option<Action> {
        let Some(device) = self.focused_device() else {
            return Some(self.missing_device_notice());
        };
        if device.active {
            let label = device.kind.to_string();
            return Some(Action::Notify(Notification::info(format!(
                "The {label} is already running"
            ))));
        }
        let command = match self.focus {
            PanelFocus::Motor => Command::StartMotor,
            PanelFocus::Valves => Command::StartValve {
                imei: device.imei.clone(),
            },
        };
        self.pending = true;
        Some(Action::Run(command))
    }

    fn stop_focused(&mut self) -> Option<Action> {
        let Some(device) = self.focused_device() else {
            return Some(self.missing_device_notice());
        };
        if !device.active {
            let label = device.kind.to_string();
            return Some(Action::Notify(Notification::info(format!(
                "The {label} is already stopped"
            ))));
        }
        let command = match self.focus {
            PanelFocus::Motor => Command::StopMotor,
            PanelFocus::Valves => Command::StopValve {
                imei: device.imei.clone(),
            },
        };
        self.pending = true;
        Some(Action::Run(command))
    }

    fn set_default_valve(&mut self) -> Option<Action> {
        if self.focus != PanelFocus::Valves {
            return None;
        }
        let Some(valve) = self.session.current_valve() else {
            return Some(self.missing_device_notice());
        };
        if valve.default_valve {
            return Some(Action::Notify(Notification::info(format!(
                "{} is already the default valve",
                valve.imei
            ))));
        }
        self.pending = true;
        Some(Action::Run(Command::SetDefaultValve {
            imei: valve.imei.clone(),
        }))
    }

    fn open_editor(&mut self) -> Option<Action> {
        let is_motor = self.focus == PanelFocus::Motor;
        let editor = {
            let Some(device) = self.focused_device() else {
                return Some(self.missing_device_notice());
            };
            let draft = self.session.draft(&device.imei);
            ScheduleEditor::open(device, is_motor, draft)
        };
        self.editor = Some(editor);
        None
    }

    /// Keys while the schedule editor is open.
    fn handle_editor_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.code == KeyCode::Esc {
            self.editor = None;
            return None;
        }
        if key.code == KeyCode::Enter {
            return self.commit_editor_field();
        }

        let editor = self.editor.as_mut()?;
        match key.code {
            KeyCode::Tab | KeyCode::Down => editor.next_field(),
            KeyCode::BackTab | KeyCode::Up => editor.prev_field(),
            KeyCode::Backspace => {
                if let Some(input) = editor.active_input_mut() {
                    input.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(input) = editor.active_input_mut() {
                    input.push(c);
                }
            }
            _ => {}
        }
        None
    }

    /// Enter inside the editor: commit the current field as a draft,
    /// or submit the whole window from the Set row.
    fn commit_editor_field(&mut self) -> Option<Action> {
        let editor = self.editor.as_mut()?;
        match editor.field {
            EditorField::Start => {
                if editor.start_input.trim().is_empty() {
                    editor.next_field();
                    return None;
                }
                match parse_editor_time(&editor.start_input) {
                    Ok(start) => {
                        editor.error = None;
                        let imei = editor.imei.clone();
                        editor.next_field();
                        Some(Action::DraftStartChanged { imei, start })
                    }
                    Err(message) => {
                        editor.error = Some(message);
                        None
                    }
                }
            }
            EditorField::Stop => {
                if editor.stop_input.trim().is_empty() {
                    editor.next_field();
                    return None;
                }
                match parse_editor_time(&editor.stop_input) {
                    Ok(stop) => {
                        editor.error = None;
                        let imei = editor.imei.clone();
                        editor.next_field();
                        Some(Action::DraftStopChanged { imei, stop })
                    }
                    Err(message) => {
                        editor.error = Some(message);
                        None
                    }
                }
            }
            EditorField::Set => {
                let start = match parse_editor_time(&editor.start_input) {
                    Ok(start) => start,
                    Err(message) => {
                        editor.error = Some(format!("start: {message}"));
                        return None;
                    }
                };
                let stop = match parse_editor_time(&editor.stop_input) {
                    Ok(stop) => stop,
                    Err(message) => {
                        editor.error = Some(format!("stop: {message}"));
                        return None;
                    }
                };
                let window = ScheduleWindow::new(start, stop);
                let command = if editor.is_motor {
                    Command::ScheduleMotor { window }
                } else {
                    Command::ScheduleValve {
                        imei: editor.imei.clone(),
                        window,
                    }
                };
                self.editor = None;
                self.pending = true;
                Some(Action::Run(command))
            }
        }
    }

    fn render_empty_states(&self, frame: &mut Frame, area: Rect) -> bool {
        if !self.session.is_empty() {
            return false;
        }
        if area.height == 0 || area.width == 0 {
            return true;
        }

        match self.phase {
            SessionPhase::Loading | SessionPhase::Authenticating => {
                let throbber = Throbber::default()
                    .label("  Loading devices...")
                    .style(Style::default().fg(theme::NEON_CYAN))
                    .throbber_style(Style::default().fg(theme::ELECTRIC_PURPLE));
                let row = centered_row(area);
                frame.render_stateful_widget(throbber, row, &mut self.throbber_state.clone());
            }
            SessionPhase::Failed => {
                let row = centered_row(area);
                frame.render_widget(
                    Paragraph::new(Line::from(vec![
                        Span::styled(
                            "Could not load devices  ",
                            Style::default().fg(theme::ERROR_RED),
                        ),
                        Span::styled("r", theme::key_hint_key()),
                        Span::styled(" retry", theme::key_hint()),
                    ]))
                    .alignment(Alignment::Center),
                    row,
                );
            }
            _ => {
                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Percentage(45),
                        Constraint::Length(1),
                        Constraint::Length(1),
                        Constraint::Percentage(45),
                    ])
                    .split(area);
                frame.render_widget(
                    Paragraph::new(Line::from(Span::styled(
                        "No devices registered",
                        Style::default().fg(theme::DIM_WHITE).add_modifier(Modifier::BOLD),
                    )))
                    .alignment(Alignment::Center),
                    rows[1],
                );
                frame.render_widget(
                    Paragraph::new(Line::from(vec![
                        Span::styled("Press ", theme::key_hint()),
                        Span::styled("2", theme::key_hint_key()),
                        Span::styled(" to register a device mapping", theme::key_hint()),
                    ]))
                    .alignment(Alignment::Center),
                    rows[2],
                );
            }
        }
        true
    }

    fn render_motor_card(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == PanelFocus::Motor;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if focused {
                theme::border_focused()
            } else {
                theme::border_default()
            })
            .title(Span::styled(" Pump motor ", theme::title_style()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(motor) = self.session.motor() else {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "No motor mapped",
                    theme::field_label(),
                ))),
                inner,
            );
            return;
        };

        let lines = device_lines(motor, self.session.draft(&motor.imei));
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_valve_card(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == PanelFocus::Valves;
        let title = match self.session.valve_position() {
            Some((index, count)) if count > 1 => format!(" Gate valves {index}/{count} "),
            _ => " Gate valve ".to_owned(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if focused {
                theme::border_focused()
            } else {
                theme::border_default()
            })
            .title(Span::styled(title, theme::title_style()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(valve) = self.session.current_valve() else {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "No gate valves mapped",
                    theme::field_label(),
                ))),
                inner,
            );
            return;
        };

        let mut lines = device_lines(valve, self.session.draft(&valve.imei));
        lines.push(detail_line(
            "Default",
            if valve.default_valve {
                Span::styled("\u{2605} yes", Style::default().fg(theme::CORAL))
            } else {
                Span::styled("no", theme::field_label())
            },
        ));
        if self.session.valve_count() > 1 {
            lines.push(Line::from(Span::styled(
                "\u{25C2} h previous   l next \u{25B8}",
                theme::key_hint(),
            )));
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_editor(&self, frame: &mut Frame, area: Rect) {
        let Some(editor) = &self.editor else { return };

        let title = format!("Schedule {}", editor.imei);
        let inner = form::render_centered_panel(frame, area, &title, 46, 17);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(form::INPUT_ROWS),
                Constraint::Length(form::INPUT_ROWS),
                Constraint::Length(1), // set row
                Constraint::Length(1), // error
                Constraint::Length(1), // format hint
                Constraint::Length(1), // key hints
            ])
            .split(inner.inner(Margin {
                horizontal: 2,
                vertical: 1,
            }));

        form::render_input_field(
            frame,
            rows[0],
            "Start",
            &editor.start_input,
            false,
            editor.field == EditorField::Start,
        );
        form::render_input_field(
            frame,
            rows[1],
            "Stop",
            &editor.stop_input,
            false,
            editor.field == EditorField::Stop,
        );

        let set_style = if editor.field == EditorField::Set {
            Style::default()
                .fg(theme::BG_DARK)
                .bg(theme::ELECTRIC_PURPLE)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme::DIM_WHITE)
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(" Set schedule ", set_style)))
                .alignment(Alignment::Center),
            rows[2],
        );

        if let Some(error) = &editor.error {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    error.clone(),
                    Style::default().fg(theme::ERROR_RED),
                )))
                .alignment(Alignment::Center),
                rows[3],
            );
        }
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "2024-03-10T08:30, 08:30, or +30m",
                theme::key_hint(),
            )))
            .alignment(Alignment::Center),
            rows[4],
        );
        form::render_key_hints(
            frame,
            rows[5],
            &[("Enter", "save / set"), ("Tab", "next"), ("Esc", "close")],
        );
    }
}

impl Component for DashboardScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.editor.is_some() {
            return Ok(self.handle_editor_key(key));
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.focus = PanelFocus::Motor,
            KeyCode::Down | KeyCode::Char('j') => self.focus = PanelFocus::Valves,
            KeyCode::Left | KeyCode::Char('h') => return Ok(Some(Action::PreviousValve)),
            KeyCode::Right | KeyCode::Char('l') => return Ok(Some(Action::NextValve)),
            KeyCode::Char('s') if !self.pending => return Ok(self.start_focused()),
            KeyCode::Char('x') if !self.pending => return Ok(self.stop_focused()),
            KeyCode::Char('d') if !self.pending => return Ok(self.set_default_valve()),
            KeyCode::Char('e') => return Ok(self.open_editor()),
            KeyCode::Char('r') if !self.pending => {
                self.pending = true;
                return Ok(Some(Action::Run(Command::Refresh)));
            }
            KeyCode::Char('L') => return Ok(Some(Action::SignOut)),
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::Tick => {
                if self.pending || self.phase == SessionPhase::Loading {
                    self.throbber_state.calc_next();
                }
            }
            Action::SessionUpdated(session) => {
                self.session = Arc::clone(session);
                self.pending = false;
                // Drop the editor if its device vanished on refresh.
                let stale = self
                    .editor
                    .as_ref()
                    .is_some_and(|editor| self.session.device(&editor.imei).is_none());
                if stale {
                    self.editor = None;
                }
            }
            Action::PhaseChanged(phase) => self.phase = *phase,
            Action::Notify(_) => self.pending = false,
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // welcome header
                Constraint::Length(1),
                Constraint::Length(8),  // motor card
                Constraint::Min(8),     // valve card
                Constraint::Length(1),  // key hints
            ])
            .split(area.inner(Margin {
                horizontal: 1,
                vertical: 0,
            }));

        let mut header = vec![Span::styled("Welcome, ", theme::field_label())];
        header.push(Span::styled(
            self.session.user_name().to_owned(),
            Style::default()
                .fg(theme::NEON_CYAN)
                .add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(Line::from(header)), rows[0]);
        if self.pending {
            let throbber_area = Rect {
                x: rows[0].x + rows[0].width.saturating_sub(14),
                width: 14.min(rows[0].width),
                ..rows[0]
            };
            let throbber = Throbber::default()
                .label(" working...")
                .style(Style::default().fg(theme::NEON_CYAN))
                .throbber_style(Style::default().fg(theme::ELECTRIC_PURPLE));
            frame.render_stateful_widget(throbber, throbber_area, &mut self.throbber_state.clone());
        }

        let body = Rect {
            y: rows[2].y,
            height: rows[2].height + rows[3].height,
            ..rows[2]
        };
        if !self.render_empty_states(frame, body) {
            self.render_motor_card(frame, rows[2]);
            self.render_valve_card(frame, rows[3]);
        }

        form::render_key_hints(
            frame,
            rows[4],
            &[
                ("s", "start"),
                ("x", "stop"),
                ("e", "schedule"),
                ("d", "default"),
                ("\u{25C2}\u{25B8}", "valve"),
                ("\u{25B4}\u{25BE}", "panel"),
                ("r", "refresh"),
                ("L", "sign out"),
            ],
        );

        self.render_editor(frame, area);
    }

    fn wants_text_input(&self) -> bool {
        self.editor.is_some()
    }

    fn set_focused(&mut self, focused: bool) {
        // A hidden screen must not keep a modal editor alive.
        if !focused {
            self.editor = None;
        }
    }

    fn id(&self) -> &str {
        "dashboard"
    }
}

// ── Rendering helpers ────────────────────────────────────────────────

fn centered_row(area: Rect) -> Rect {
    let y = area.y + area.height / 2;
    let width = 40.min(area.width);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y,
        width,
        height: 1,
    }
}

fn detail_line(label: &str, value: Span<'static>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<10}"), theme::field_label()),
        value,
    ])
}

/// The common card body: IMEI, run state, scheduled window, countdown.
fn device_lines(device: &Device, draft: Option<ScheduleWindow>) -> Vec<Line<'static>> {
    let mut lines = vec![detail_line(
        "IMEI",
        Span::styled(device.imei.clone(), Style::default().fg(theme::DIM_WHITE)),
    )];

    let state = if device.active {
        Span::styled(
            "\u{25CF} running",
            Style::default().fg(theme::SUCCESS_GREEN),
        )
    } else {
        Span::styled("\u{25CB} stopped", Style::default().fg(theme::ERROR_RED))
    };
    lines.push(detail_line("State", state));

    // Drafts shadow what the controller last reported.
    let (start, stop, is_draft) = match draft {
        Some(window) => (Some(window.start), Some(window.stop), true),
        None => (device.reported_start, device.reported_stop, false),
    };
    let suffix = if is_draft { "  (draft)" } else { "" };
    lines.push(detail_line(
        "Start",
        Span::styled(
            format!("{}{suffix}", start.map_or_else(|| "--".to_owned(), fmt_dt)),
            Style::default().fg(theme::ELECTRIC_YELLOW),
        ),
    ));
    lines.push(detail_line(
        "Stop",
        Span::styled(
            format!("{}{suffix}", stop.map_or_else(|| "--".to_owned(), fmt_dt)),
            Style::default().fg(theme::ELECTRIC_YELLOW),
        ),
    ));

    let now = Local::now().naive_local();
    if let Some(label) = countdown_label(device.active, start, stop, now) {
        lines.push(detail_line(
            "",
            Span::styled(label, theme::key_hint()),
        ));
    }

    lines
}

fn fmt_dt(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

/// "starts in 25m" / "stops in 1h 5m", minute resolution.
fn countdown_label(
    active: bool,
    start: Option<NaiveDateTime>,
    stop: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Option<String> {
    let (verb, when) = if active {
        ("stops", stop?)
    } else {
        ("starts", start?)
    };
    let secs = u64::try_from((when - now).num_seconds()).ok()?;
    if secs == 0 {
        return None;
    }
    if secs < 60 {
        return Some(format!("{verb} in under a minute"));
    }
    let rounded = Duration::from_secs(secs - secs % 60);
    Some(format!("{verb} in {}", humantime::format_duration(rounded)))
}

/// Same forms the CLI accepts: full datetimes, today's time, or a
/// `+30m` offset from now.
fn parse_editor_time(input: &str) -> Result<NaiveDateTime, String> {
    let input = input.trim();

    if let Some(offset) = input.strip_prefix('+') {
        let duration = humantime::parse_duration(offset.trim())
            .map_err(|e| format!("bad relative offset '{input}': {e}"))?;
        let duration = chrono::Duration::from_std(duration)
            .map_err(|_| format!("relative offset '{input}' is out of range"))?;
        return Ok(Local::now().naive_local() + duration);
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(parsed);
        }
    }

    const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];
    for format in TIME_FORMATS {
        if let Ok(parsed) = NaiveTime::parse_from_str(input, format) {
            return Ok(Local::now().date_naive().and_time(parsed));
        }
    }

    Err(format!("cannot parse '{input}'"))
}
