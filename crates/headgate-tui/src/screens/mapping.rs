//! Mapping screen: binds a motor/valve controller pair to the
//! signed-in account.
//!
//! The left panel is the registration form; the right panel lists the
//! devices already mapped so the operator can see what exists before
//! adding more. The account is taken from the active session, never
//! typed.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Row, Table};
use std::sync::Arc;
use throbber_widgets_tui::{Throbber, ThrobberState};

use headgate_core::{Command, Device, DeviceSession, MappingRequest};

use crate::action::{Action, NotificationLevel};
use crate::component::Component;
use crate::theme;
use crate::widgets::form;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    MotorImei,
    ValveImei,
    MotorActive,
    ValveActive,
    DefaultValve,
}

impl Field {
    const ALL: [Field; 5] = [
        Field::MotorImei,
        Field::ValveImei,
        Field::MotorActive,
        Field::ValveActive,
        Field::DefaultValve,
    ];

    fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn is_text(self) -> bool {
        matches!(self, Field::MotorImei | Field::ValveImei)
    }
}

/// The device-pair registration form.
pub struct MappingScreen {
    session: Arc<DeviceSession>,
    motor_imei: String,
    valve_imei: String,
    motor_active: bool,
    valve_active: bool,
    default_valve: bool,
    active_field: Field,
    submitting: bool,
    error: Option<String>,
    throbber_state: ThrobberState,
}

impl MappingScreen {
    pub fn new() -> Self {
        Self {
            session: Arc::new(DeviceSession::default()),
            motor_imei: String::new(),
            valve_imei: String::new(),
            motor_active: true,
            valve_active: true,
            default_valve: false,
            active_field: Field::MotorImei,
            submitting: false,
            error: None,
            throbber_state: ThrobberState::default(),
        }
    }

    fn active_input_mut(&mut self) -> Option<&mut String> {
        match self.active_field {
            Field::MotorImei => Some(&mut self.motor_imei),
            Field::ValveImei => Some(&mut self.valve_imei),
            _ => None,
        }
    }

    fn toggle_active(&mut self) {
        match self.active_field {
            Field::MotorActive => self.motor_active = !self.motor_active,
            Field::ValveActive => self.valve_active = !self.valve_active,
            Field::DefaultValve => self.default_valve = !self.default_valve,
            Field::MotorImei | Field::ValveImei => {}
        }
    }

    fn clear_form(&mut self) {
        self.motor_imei.clear();
        self.valve_imei.clear();
        self.motor_active = true;
        self.valve_active = true;
        self.default_valve = false;
        self.active_field = Field::MotorImei;
    }

    fn submit(&mut self) -> Option<Action> {
        let motor = self.motor_imei.trim();
        let valve = self.valve_imei.trim();
        if motor.is_empty() || valve.is_empty() {
            self.error = Some("Please fill in all fields".to_owned());
            return None;
        }

        self.error = None;
        self.submitting = true;
        Some(Action::Run(Command::RegisterMapping(MappingRequest {
            motor_imei: motor.to_owned(),
            valve_imei: valve.to_owned(),
            motor_active: self.motor_active,
            valve_active: self.valve_active,
            default_valve: self.default_valve,
        })))
    }

    fn render_form(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
            .title(Span::styled(" Register mapping ", theme::title_style()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // account
                Constraint::Length(1),
                Constraint::Length(form::INPUT_ROWS), // motor imei
                Constraint::Length(form::INPUT_ROWS), // valve imei
                Constraint::Length(1),                // motor active
                Constraint::Length(1),                // valve active
                Constraint::Length(1),                // default valve
                Constraint::Length(1),
                Constraint::Length(1), // status / error
                Constraint::Length(1),
                Constraint::Length(1), // hints
            ])
            .split(inner.inner(Margin {
                horizontal: 2,
                vertical: 1,
            }));

        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Account ", theme::field_label()),
                Span::styled(
                    self.session.user_name().to_owned(),
                    theme::field_label_active(),
                ),
            ])),
            rows[0],
        );

        form::render_input_field(
            frame,
            rows[2],
            "Motor IMEI",
            &self.motor_imei,
            false,
            self.active_field == Field::MotorImei,
        );
        form::render_input_field(
            frame,
            rows[3],
            "Gate valve IMEI",
            &self.valve_imei,
            false,
            self.active_field == Field::ValveImei,
        );
        form::render_toggle_field(
            frame,
            rows[4],
            "Motor active",
            self.motor_active,
            self.active_field == Field::MotorActive,
        );
        form::render_toggle_field(
            frame,
            rows[5],
            "Valve active",
            self.valve_active,
            self.active_field == Field::ValveActive,
        );
        form::render_toggle_field(
            frame,
            rows[6],
            "Default valve",
            self.default_valve,
            self.active_field == Field::DefaultValve,
        );

        if self.submitting {
            let throbber = Throbber::default()
                .label("  Registering...")
                .style(Style::default().fg(theme::NEON_CYAN))
                .throbber_style(Style::default().fg(theme::ELECTRIC_PURPLE));
            frame.render_stateful_widget(throbber, rows[8], &mut self.throbber_state.clone());
        } else if let Some(error) = &self.error {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    error.clone(),
                    Style::default().fg(theme::ERROR_RED),
                ))),
                rows[8],
            );
        }

        let hints: &[(&str, &str)] = if self.active_field.is_text() {
            &[("Enter", "register"), ("Tab", "next"), ("Esc", "back")]
        } else {
            &[
                ("Space", "toggle"),
                ("Enter", "register"),
                ("Tab", "next"),
                ("Esc", "back"),
            ]
        };
        form::render_key_hints(frame, rows[10], hints);
    }

    fn render_devices(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default())
            .title(Span::styled(" Mapped devices ", theme::title_style()));

        let devices: Vec<&Device> = self
            .session
            .motor()
            .into_iter()
            .chain(self.session.valves().iter())
            .collect();

        if devices.is_empty() {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "No devices registered",
                    theme::field_label(),
                ))),
                inner,
            );
            return;
        }

        let header = Row::new(["IMEI", "Type", "State", "Default"]).style(theme::table_header());
        let rows: Vec<Row> = devices
            .iter()
            .map(|device| {
                let state = if device.active { "running" } else { "stopped" };
                let default = if device.default_valve { "\u{2605}" } else { "" };
                Row::new([
                    device.imei.clone(),
                    device.kind.to_string(),
                    state.to_owned(),
                    default.to_owned(),
                ])
                .style(theme::table_row())
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(18),
                Constraint::Length(12),
                Constraint::Length(9),
                Constraint::Length(7),
            ],
        )
        .header(header)
        .block(block)
        .column_spacing(2);
        frame.render_widget(table, area);
    }
}

impl Component for MappingScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.submitting {
            return Ok(None);
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => self.active_field = self.active_field.next(),
            KeyCode::BackTab | KeyCode::Up => self.active_field = self.active_field.prev(),
            KeyCode::Enter => return Ok(self.submit()),
            KeyCode::Esc => return Ok(Some(Action::GoBack)),
            KeyCode::Char(' ') if !self.active_field.is_text() => self.toggle_active(),
            KeyCode::Backspace => {
                if let Some(input) = self.active_input_mut() {
                    input.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(input) = self.active_input_mut() {
                    input.push(c);
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::Tick => {
                if self.submitting {
                    self.throbber_state.calc_next();
                }
            }
            Action::SessionUpdated(session) => {
                self.session = Arc::clone(session);
            }
            Action::Notify(notification) => {
                if self.submitting {
                    self.submitting = false;
                    if notification.level == NotificationLevel::Success {
                        self.clear_form();
                    }
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(46), Constraint::Min(30)])
            .split(area.inner(Margin {
                horizontal: 1,
                vertical: 0,
            }));

        self.render_form(frame, columns[0]);
        self.render_devices(frame, columns[1]);
    }

    fn wants_text_input(&self) -> bool {
        true
    }

    fn id(&self) -> &str {
        "mapping"
    }
}
