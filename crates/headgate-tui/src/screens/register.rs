//! Account registration screen.
//!
//! Collects the six required fields and submits them to the backend.
//! Success does not sign the user in; the app returns to the sign-in
//! screen with the new account name prefilled.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use secrecy::SecretString;
use throbber_widgets_tui::{Throbber, ThrobberState};

use headgate_core::RegisterAccount;

use crate::action::Action;
use crate::component::Component;
use crate::screen::ScreenId;
use crate::theme;
use crate::widgets::form;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    User,
    First,
    Last,
    Email,
    Password,
    Imei,
}

impl Field {
    const ALL: [Field; 6] = [
        Field::User,
        Field::First,
        Field::Last,
        Field::Email,
        Field::Password,
        Field::Imei,
    ];

    fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// The registration form.
pub struct RegisterScreen {
    user_input: String,
    first_input: String,
    last_input: String,
    email_input: String,
    password_input: String,
    imei_input: String,
    active_field: Field,
    show_password: bool,
    submitting: bool,
    error: Option<String>,
    throbber_state: ThrobberState,
}

impl RegisterScreen {
    pub fn new() -> Self {
        Self {
            user_input: String::new(),
            first_input: String::new(),
            last_input: String::new(),
            email_input: String::new(),
            password_input: String::new(),
            imei_input: String::new(),
            active_field: Field::User,
            show_password: false,
            submitting: false,
            error: None,
            throbber_state: ThrobberState::default(),
        }
    }

    fn active_input_mut(&mut self) -> &mut String {
        match self.active_field {
            Field::User => &mut self.user_input,
            Field::First => &mut self.first_input,
            Field::Last => &mut self.last_input,
            Field::Email => &mut self.email_input,
            Field::Password => &mut self.password_input,
            Field::Imei => &mut self.imei_input,
        }
    }

    fn clear_form(&mut self) {
        self.user_input.clear();
        self.first_input.clear();
        self.last_input.clear();
        self.email_input.clear();
        self.password_input.clear();
        self.imei_input.clear();
        self.active_field = Field::User;
    }

    fn submit(&mut self) -> Option<Action> {
        let texts = [
            self.user_input.trim(),
            self.first_input.trim(),
            self.last_input.trim(),
            self.email_input.trim(),
            self.imei_input.trim(),
        ];
        if texts.iter().any(|t| t.is_empty()) || self.password_input.is_empty() {
            self.error = Some("Please fill in all fields".to_owned());
            return None;
        }

        self.error = None;
        self.submitting = true;
        Some(Action::RegisterSubmitted(Box::new(RegisterAccount {
            user_name: self.user_input.trim().to_owned(),
            first_name: self.first_input.trim().to_owned(),
            last_name: self.last_input.trim().to_owned(),
            email: self.email_input.trim().to_owned(),
            password: SecretString::from(self.password_input.clone()),
            imei: self.imei_input.trim().to_owned(),
        })))
    }
}

impl Component for RegisterScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.submitting {
            return Ok(None);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('u') {
                self.show_password = !self.show_password;
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => self.active_field = self.active_field.next(),
            KeyCode::BackTab | KeyCode::Up => self.active_field = self.active_field.prev(),
            KeyCode::Enter => {
                if self.active_field == Field::Imei {
                    return Ok(self.submit());
                }
                self.active_field = self.active_field.next();
            }
            KeyCode::Esc => return Ok(Some(Action::SwitchScreen(ScreenId::SignIn))),
            KeyCode::Backspace => {
                self.active_input_mut().pop();
            }
            KeyCode::Char(c) => {
                self.active_input_mut().push(c);
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
            Action::RegisterResult(Ok(_)) => {
                self.submitting = false;
                self.clear_form();
            }
            Action::RegisterResult(Err(message)) => {
                self.submitting = false;
                self.error = Some(message.clone());
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            area,
        );

        let inner = form::render_centered_panel(frame, area, "Create account", 62, 27);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(form::INPUT_ROWS), // username
                Constraint::Length(form::INPUT_ROWS), // first + last
                Constraint::Length(form::INPUT_ROWS), // email
                Constraint::Length(form::INPUT_ROWS), // password
                Constraint::Length(form::INPUT_ROWS), // imei
                Constraint::Length(1),                // status / error
                Constraint::Length(1),
                Constraint::Length(1), // hints
            ])
            .split(inner.inner(Margin {
                horizontal: 2,
                vertical: 1,
            }));

        form::render_input_field(
            frame,
            rows[0],
            "Username",
            &self.user_input,
            false,
            self.active_field == Field::User,
        );

        let names = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(50),
                Constraint::Length(2),
                Constraint::Percentage(50),
            ])
            .split(rows[1]);
        form::render_input_field(
            frame,
            names[0],
            "First name",
            &self.first_input,
            false,
            self.active_field == Field::First,
        );
        form::render_input_field(
            frame,
            names[2],
            "Last name",
            &self.last_input,
            false,
            self.active_field == Field::Last,
        );

        form::render_input_field(
            frame,
            rows[2],
            "Email",
            &self.email_input,
            false,
            self.active_field == Field::Email,
        );
        form::render_input_field(
            frame,
            rows[3],
            "Password",
            &self.password_input,
            !self.show_password,
            self.active_field == Field::Password,
        );
        form::render_input_field(
            frame,
            rows[4],
            "Controller IMEI",
            &self.imei_input,
            false,
            self.active_field == Field::Imei,
        );

        if self.submitting {
            let throbber = Throbber::default()
                .label("  Creating account...")
                .style(Style::default().fg(theme::NEON_CYAN))
                .throbber_style(Style::default().fg(theme::ELECTRIC_PURPLE));
            frame.render_stateful_widget(throbber, rows[5], &mut self.throbber_state.clone());
        } else if let Some(error) = &self.error {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    error.clone(),
                    Style::default().fg(theme::ERROR_RED),
                ))),
                rows[5],
            );
        }

        form::render_key_hints(
            frame,
            rows[7],
            &[
                ("Enter", "next / submit"),
                ("Tab", "next field"),
                ("Ctrl+U", "show password"),
                ("Esc", "back to sign-in"),
            ],
        );
    }

    fn wants_text_input(&self) -> bool {
        true
    }

    fn id(&self) -> &str {
        "register"
    }
}
