//! Sign-in screen: the entry gate shown whenever no session is active.
//!
//! Collects username + password, validates locally before touching the
//! network, and hands the credentials to the app loop which drives the
//! actual authentication. Ctrl+R jumps to account registration.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use secrecy::SecretString;
use throbber_widgets_tui::{Throbber, ThrobberState};

use crate::action::Action;
use crate::component::Component;
use crate::screen::ScreenId;
use crate::theme;
use crate::widgets::form;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    User,
    Password,
}

/// The sign-in form.
pub struct SignInScreen {
    /// Backend URL, shown so the user knows where they are signing in.
    backend: String,
    user_input: String,
    password_input: String,
    active_field: Field,
    show_password: bool,
    signing_in: bool,
    error: Option<String>,
    throbber_state: ThrobberState,
}

impl SignInScreen {
    pub fn new(backend: String, prefill_user: Option<String>) -> Self {
        Self {
            backend,
            user_input: prefill_user.unwrap_or_default(),
            password_input: String::new(),
            active_field: Field::User,
            show_password: false,
            signing_in: false,
            error: None,
            throbber_state: ThrobberState::default(),
        }
    }

    fn active_input_mut(&mut self) -> &mut String {
        match self.active_field {
            Field::User => &mut self.user_input,
            Field::Password => &mut self.password_input,
        }
    }

    fn submit(&mut self) -> Option<Action> {
        let user = self.user_input.trim().to_owned();
        if user.is_empty() || self.password_input.is_empty() {
            self.error = Some("Please enter username and password".to_owned());
            return None;
        }
        self.error = None;
        self.signing_in = true;
        Some(Action::SignInSubmitted {
            user,
            password: SecretString::from(self.password_input.clone()),
        })
    }
}

impl Component for SignInScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.signing_in {
            // A request is in flight; resolve or fail before editing.
            return Ok(None);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('r') => return Ok(Some(Action::SwitchScreen(ScreenId::Register))),
                KeyCode::Char('u') => {
                    self.show_password = !self.show_password;
                    return Ok(None);
                }
                _ => return Ok(None),
            }
        }

        match key.code {
            // Two fields, so next and previous are the same flip.
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
                self.active_field = match self.active_field {
                    Field::User => Field::Password,
                    Field::Password => Field::User,
                };
            }
            KeyCode::Enter => match self.active_field {
                Field::User => self.active_field = Field::Password,
                Field::Password => return Ok(self.submit()),
            },
            KeyCode::Esc => return Ok(Some(Action::Quit)),
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
                if self.signing_in {
                    self.throbber_state.calc_next();
                }
            }
            Action::SignInResult(Ok(_)) => {
                self.signing_in = false;
                self.password_input.clear();
                self.error = None;
            }
            Action::SignInResult(Err(message)) => {
                self.signing_in = false;
                self.error = Some(message.clone());
            }
            // Registration succeeded: prefill the new account name so
            // the user only has to type the password.
            Action::RegisterResult(Ok(user)) => {
                self.user_input = user.clone();
                self.password_input.clear();
                self.active_field = Field::Password;
                self.error = None;
            }
            Action::SignOut => {
                self.password_input.clear();
                self.signing_in = false;
                self.error = None;
                self.active_field = Field::Password;
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

        let inner = form::render_centered_panel(frame, area, "headgate", 56, 18);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // backend
                Constraint::Length(1),
                Constraint::Length(form::INPUT_ROWS),
                Constraint::Length(form::INPUT_ROWS),
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
                Span::styled("Backend ", theme::field_label()),
                Span::styled(self.backend.clone(), theme::key_hint()),
            ])),
            rows[0],
        );

        form::render_input_field(
            frame,
            rows[2],
            "Username",
            &self.user_input,
            false,
            self.active_field == Field::User,
        );
        form::render_input_field(
            frame,
            rows[3],
            "Password",
            &self.password_input,
            !self.show_password,
            self.active_field == Field::Password,
        );

        if self.signing_in {
            let throbber = Throbber::default()
                .label("  Signing in...")
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
                ("Enter", "sign in"),
                ("Tab", "next"),
                ("Ctrl+R", "register"),
                ("Ctrl+U", "show password"),
                ("Esc", "quit"),
            ],
        );
    }

    fn wants_text_input(&self) -> bool {
        true
    }

    fn id(&self) -> &str {
        "sign-in"
    }
}
