//! Email/password prompt drawn over the dashboard.

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AuthMode {
    SignIn,
    SignUp,
}

impl AuthMode {
    fn title(self) -> &'static str {
        match self {
            AuthMode::SignIn => "Sign in",
            AuthMode::SignUp => "Create account",
        }
    }

    fn toggle(self) -> Self {
        match self {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Email,
    Password,
}

/// What the dashboard should do after a key reached the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FormAction {
    Continue,
    Submit,
    Cancel,
}

#[derive(Debug, Clone)]
pub(super) struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    field: Field,
}

impl AuthForm {
    pub fn new() -> Self {
        Self {
            mode: AuthMode::SignIn,
            email: String::new(),
            password: String::new(),
            field: Field::Email,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> FormAction {
        match code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => {
                if self.field == Field::Email {
                    self.field = Field::Password;
                } else if !self.email.trim().is_empty() && !self.password.is_empty() {
                    return FormAction::Submit;
                }
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.field = match self.field {
                    Field::Email => Field::Password,
                    Field::Password => Field::Email,
                };
            }
            KeyCode::F(2) => self.mode = self.mode.toggle(),
            KeyCode::Backspace => {
                self.active_mut().pop();
            }
            KeyCode::Char(c) => self.active_mut().push(c),
            _ => {}
        }
        FormAction::Continue
    }

    /// Keep the email after a failed attempt; the password must be retyped.
    pub fn reject(&mut self) {
        self.password.clear();
        self.field = Field::Password;
    }

    fn active_mut(&mut self) -> &mut String {
        match self.field {
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        }
    }

    pub fn draw(&self, frame: &mut ratatui::Frame<'_>, area: Rect, error: Option<&str>) {
        let popup = centered(area, 50, 9);
        frame.render_widget(Clear, popup);

        let focus = |f: Field| {
            if self.field == f {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default()
            }
        };
        let switch = match self.mode {
            AuthMode::SignIn => "F2 new here? create an account",
            AuthMode::SignUp => "F2 have an account? sign in",
        };

        let mut lines = vec![
            Line::from(Span::styled(
                "Save your vote and keep it tied to your account.",
                Style::default().fg(Color::Gray),
            )),
            Line::raw(""),
            Line::from(vec![Span::raw("Email:    "), Span::styled(self.email.clone(), focus(Field::Email))]),
            Line::from(vec![
                Span::raw("Password: "),
                Span::styled("*".repeat(self.password.chars().count()), focus(Field::Password)),
            ]),
            Line::raw(""),
            Line::from(Span::styled(
                format!("Enter submit  Tab field  {switch}  Esc cancel"),
                Style::default().fg(Color::Gray),
            )),
        ];
        if let Some(err) = error {
            lines.push(Line::from(Span::styled(err.to_string(), Style::default().fg(Color::Red))));
        }

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            format!(" {} ", self.mode.title()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), popup);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height.min(area.height)),
            Constraint::Fill(1),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(width.min(area.width)),
            Constraint::Fill(1),
        ])
        .split(rows[1])[1]
}
