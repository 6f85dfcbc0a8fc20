//! Ratatui-based terminal dashboard.
//!
//! The dashboard starts a background ingestion session and redraws as
//! snapshots arrive: the chart fills in progressively while the raw CSV
//! streams, or appears at once when the precomputed summary is available.
//! A range selector re-filters the latest snapshot without reloading.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
};
use tracing::debug;

use crate::collab::{BackendError, STANCE_TEXT, Services, VoteChoice, VoteTally};
use crate::domain::{IngestConfig, PeriodAggregate, RangeKind};
use crate::error::AppError;
use crate::ingest::{IngestHandle, IngestState, spawn_ingest};
use crate::report::{NO_DATA, RangeSummary, fmt_amount};

mod auth_form;
mod plotters_chart;

use auth_form::{AuthForm, AuthMode, FormAction};
use plotters_chart::{RETAIL_RGB, SalesPlottersChart, WAREHOUSE_RGB, legend_color};

/// Start the dashboard.
pub fn run(config: IngestConfig, services: Services) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config, services);
    app.reload();
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    config: IngestConfig,
    services: Services,
    session: Option<IngestHandle>,
    state: IngestState,
    range: RangeKind,
    tally: Option<VoteTally>,
    my_vote: Option<VoteChoice>,
    auth_form: Option<AuthForm>,
    auth_error: Option<String>,
    status: String,
}

impl App {
    fn new(config: IngestConfig, services: Services) -> Self {
        Self {
            config,
            services,
            session: None,
            state: IngestState::new(),
            range: RangeKind::Year,
            tally: None,
            my_vote: None,
            auth_form: None,
            auth_error: None,
            status: String::new(),
        }
    }

    /// Start a fresh session. The previous one is cancelled first, so its
    /// late events never reach the new state.
    fn reload(&mut self) {
        if let Some(old) = self.session.take() {
            old.cancel();
        }
        self.state = IngestState::new();
        self.session = Some(spawn_ingest(self.config.clone()));
        self.status = format!("Loading {}...", self.config.csv);
        self.refresh_tally();
    }

    fn refresh_tally(&mut self) {
        if !self.services.is_configured() {
            self.tally = None;
            self.my_vote = None;
            return;
        }
        match self.services.tally() {
            Ok(t) => self.tally = Some(t),
            Err(err) => {
                debug!(error = %err, "vote tally unavailable");
                self.status = format!("Failed to load vote totals: {err}");
            }
        }
        match self.services.my_vote() {
            Ok(v) => self.my_vote = v,
            Err(err) => self.status = format!("Failed to load vote: {err}"),
        }
    }

    fn open_sign_in(&mut self) {
        if !self.services.is_configured() {
            self.status = self.services.status_line();
        } else if let Some(user) = self.services.current_user() {
            self.status = format!("Already signed in as {} (o to sign out).", user.email);
        } else {
            self.auth_form = Some(AuthForm::new());
            self.auth_error = None;
        }
    }

    fn submit_auth(&mut self) {
        let Some(form) = self.auth_form.as_mut() else {
            return;
        };
        let result = match form.mode {
            AuthMode::SignIn => self.services.sign_in(&form.email, &form.password),
            AuthMode::SignUp => self.services.sign_up(&form.email, &form.password),
        };
        match result {
            Ok(user) => {
                self.auth_form = None;
                self.auth_error = None;
                self.status = format!("Signed in as {}.", user.email);
                self.refresh_tally();
            }
            Err(err) => {
                form.reject();
                self.auth_error = Some(err.to_string());
            }
        }
    }

    fn sign_out(&mut self) {
        if self.services.current_user().is_none() {
            return;
        }
        match self.services.sign_out() {
            Ok(()) => {
                self.my_vote = None;
                self.status = "Signed out.".to_string();
            }
            Err(err) => self.status = format!("Sign out failed: {err}"),
        }
    }

    fn vote(&mut self, choice: VoteChoice) {
        self.status = match self.services.cast_vote(choice) {
            Ok(_) => {
                self.refresh_tally();
                self.my_vote = Some(choice);
                "Thanks, your vote was recorded.".to_string()
            }
            Err(BackendError::AlreadyVoted) => "You have already voted. Each account votes once.".to_string(),
            Err(BackendError::NotSignedIn) => "Sign in to vote (press a).".to_string(),
            Err(BackendError::Unconfigured(reason)) => format!("Voting unavailable: {reason}"),
            Err(err) => format!("Failed to register your response: {err}"),
        };
    }

    /// Drain pending ingestion events. Returns `true` when anything changed.
    fn pump(&mut self) -> bool {
        let Some(session) = &self.session else {
            return false;
        };

        let mut changed = false;
        for ev in session.try_events() {
            self.state.apply(ev);
            changed = true;
        }

        if changed && !self.state.loading() {
            self.status = match self.state.error() {
                Some(err) => format!("Load failed: {err}"),
                None => format!("Loaded {} periods.", self.state.series().len()),
            };
        }
        changed
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.pump() {
                needs_redraw = true;
            }

            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if let Some(form) = self.auth_form.as_mut() {
            match form.handle_key(code) {
                FormAction::Continue => {}
                FormAction::Submit => self.submit_auth(),
                FormAction::Cancel => {
                    self.auth_form = None;
                    self.auth_error = None;
                }
            }
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left => self.range = self.range.prev(),
            KeyCode::Right | KeyCode::Tab => self.range = self.range.next(),
            KeyCode::Char(c @ '1'..='4') => {
                let idx = (c as usize) - ('1' as usize);
                self.range = RangeKind::ALL[idx];
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('v') => self.refresh_tally(),
            KeyCode::Char('a') => self.open_sign_in(),
            KeyCode::Char('o') => self.sign_out(),
            KeyCode::Char('y') => self.vote(VoteChoice::Yes),
            KeyCode::Char('n') => self.vote(VoteChoice::No),
            _ => {}
        }
        false
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(5),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(size);

        let rows = self.state.filtered(self.range);

        self.draw_header(frame, chunks[0]);
        draw_tiles(frame, chunks[1], &rows);
        self.draw_body(frame, chunks[2], &rows);
        self.draw_footer(frame, chunks[3]);

        if let Some(form) = &self.auth_form {
            form.draw(frame, size, self.auth_error.as_deref());
        }
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            " Supply Pulse: warehouse and retail sales ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let halves = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let titles: Vec<Line> = RangeKind::ALL
            .iter()
            .enumerate()
            .map(|(i, r)| Line::from(format!("{} {}", i + 1, r.short_label())))
            .collect();
        let selected = RangeKind::ALL
            .iter()
            .position(|r| *r == self.range)
            .unwrap_or(0);
        let tabs = Tabs::new(titles)
            .select(selected)
            .style(Style::default().fg(Color::Gray))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White));
        frame.render_widget(tabs, halves[0]);

        let (pill, pill_style) = if let Some(err) = self.state.error() {
            (format!(" error: {err} "), Style::default().fg(Color::White).bg(Color::Red))
        } else if self.state.loading() {
            (" loading… ".to_string(), Style::default().fg(Color::Black).bg(Color::Yellow))
        } else {
            (" ready ".to_string(), Style::default().fg(Color::Black).bg(Color::Green))
        };
        let latest = self
            .state
            .latest_month_key()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());

        let line = Line::from(vec![
            Span::styled(pill, pill_style),
            Span::raw(format!("  {} | latest: {latest} | source: {}", self.range.display_name(), self.config.csv)),
        ]);
        frame.render_widget(Paragraph::new(line), halves[1]);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect, rows: &[PeriodAggregate]) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(36)])
            .split(area);

        draw_chart(frame, chunks[0], rows, self.state.loading());
        self.draw_vote_panel(frame, chunks[1]);
    }

    fn draw_vote_panel(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines = vec![
            Line::from(Span::styled("Civic voice", Style::default().fg(Color::Cyan))),
            Line::from(Span::styled(STANCE_TEXT, Style::default().fg(Color::Gray))),
            Line::raw(""),
            Line::raw(self.services.status_line()),
        ];

        match &self.tally {
            Some(t) if t.total > 0 => {
                lines.push(Line::from(Span::styled(
                    format!("Yes • {} ({}%)", t.yes, t.yes_pct()),
                    Style::default().fg(Color::Green),
                )));
                lines.push(Line::from(Span::styled(
                    format!("No • {} ({}%)", t.no, t.no_pct()),
                    Style::default().fg(Color::Red),
                )));
                lines.push(Line::raw(format!("Total votes: {}", t.total)));
            }
            Some(_) => lines.push(Line::raw("No votes yet. Be the first to vote.")),
            None => {}
        }

        if self.services.is_configured() {
            lines.push(Line::raw(""));
            match (self.services.current_user(), self.my_vote) {
                (Some(user), Some(choice)) => {
                    lines.push(Line::raw(format!("Signed in as {}", user.email)));
                    lines.push(Line::raw(format!("Your vote: {}", vote_label(choice))));
                }
                (Some(user), None) => {
                    lines.push(Line::raw(format!("Signed in as {}", user.email)));
                    lines.push(Line::from(Span::styled(
                        "Cast your vote. You can only vote once. y accept, n deny",
                        Style::default().fg(Color::Yellow),
                    )));
                }
                (None, _) => lines.push(Line::raw("Press a to sign in and vote.")),
            }
        }

        let p = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Vote").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "←/→ or 1-4 range  r reload  a sign in  y/n vote  v refresh votes  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn draw_tiles(frame: &mut ratatui::Frame<'_>, area: Rect, rows: &[PeriodAggregate]) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)])
        .split(area);

    let summary = RangeSummary::from_rows(rows);
    let tiles = match &summary {
        Some(s) => [
            ("Retail volume", fmt_amount(s.retail_total), format!("across {} periods", s.periods)),
            ("Warehouse volume", fmt_amount(s.warehouse_total), "same timeframe".to_string()),
            ("Latest period", s.last_period.to_string(), String::new()),
        ],
        None => [
            ("Retail volume", "-".to_string(), String::new()),
            ("Warehouse volume", "-".to_string(), String::new()),
            ("Latest period", "-".to_string(), String::new()),
        ],
    };

    for ((title, value, note), rect) in tiles.into_iter().zip(cols.iter()) {
        let text = Text::from(vec![
            Line::from(Span::styled(value, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(Span::styled(note, Style::default().fg(Color::Gray))),
        ]);
        let p = Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(p, *rect);
    }
}

fn draw_chart(frame: &mut ratatui::Frame<'_>, area: Rect, rows: &[PeriodAggregate], loading: bool) {
    let block = Block::default()
        .title(Line::from(vec![
            Span::raw("Sales "),
            Span::styled("retail", Style::default().fg(legend_color(RETAIL_RGB))),
            Span::raw(" / "),
            Span::styled("warehouse", Style::default().fg(legend_color(WAREHOUSE_RGB))),
        ]))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let Some(data) = chart_series(rows) else {
        let (msg, color) = if loading {
            ("Waiting for data...", Color::Yellow)
        } else {
            (NO_DATA, Color::Gray)
        };
        frame.render_widget(Paragraph::new(msg).style(Style::default().fg(color)), inner);
        return;
    };

    let widget = SalesPlottersChart {
        retail: &data.retail,
        warehouse: &data.warehouse,
        labels: &data.labels,
        x_bounds: data.x_bounds,
        y_bounds: data.y_bounds,
    };
    frame.render_widget(widget, inner);
}

fn vote_label(choice: VoteChoice) -> &'static str {
    match choice {
        VoteChoice::Yes => "accept",
        VoteChoice::No => "deny",
    }
}

/// Series and bounds for the chart widget.
#[derive(Debug, Clone, PartialEq)]
struct ChartData {
    retail: Vec<(f64, f64)>,
    warehouse: Vec<(f64, f64)>,
    labels: Vec<String>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// `None` for an empty range.
fn chart_series(rows: &[PeriodAggregate]) -> Option<ChartData> {
    if rows.is_empty() {
        return None;
    }

    let retail: Vec<(f64, f64)> = rows.iter().enumerate().map(|(i, r)| (i as f64, r.retail)).collect();
    let warehouse: Vec<(f64, f64)> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (i as f64, r.warehouse))
        .collect();
    let labels = rows.iter().map(|r| r.period_key.to_string()).collect();

    // A single period still needs a non-empty x span.
    let x_bounds = [0.0, (rows.len() - 1).max(1) as f64];

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in retail.iter().chain(&warehouse) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = 0.0;
        y_max = 1.0;
    } else if y_max <= y_min {
        y_min -= 1.0;
        y_max += 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    let y_bounds = [y_min - pad, y_max + pad];

    Some(ChartData {
        retail,
        warehouse,
        labels,
        x_bounds,
        y_bounds,
    })
}

/// Compact amount for axis ticks: `1.2M`, `35k`, `420`.
fn fmt_axis_amount(v: f64) -> String {
    let a = v.abs();
    if a >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if a >= 10_000.0 {
        format!("{:.0}k", v / 1_000.0)
    } else if a >= 1_000.0 {
        format!("{:.1}k", v / 1_000.0)
    } else {
        format!("{v:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PeriodKey;
    use std::fs;

    fn agg(month: f64, retail: f64, warehouse: f64) -> PeriodAggregate {
        PeriodAggregate {
            period_key: PeriodKey::from_parts(2021.0, month).unwrap(),
            retail,
            warehouse,
        }
    }

    #[test]
    fn chart_series_bounds() {
        assert!(chart_series(&[]).is_none());

        let data = chart_series(&[agg(1.0, 10.0, 0.0), agg(2.0, 30.0, 20.0)]).unwrap();
        assert_eq!(data.labels, vec!["2021-01".to_string(), "2021-02".to_string()]);
        assert_eq!(data.x_bounds, [0.0, 1.0]);
        assert!((data.y_bounds[0] + 1.5).abs() < 1e-9);
        assert!((data.y_bounds[1] - 31.5).abs() < 1e-9);

        let single = chart_series(&[agg(5.0, 7.0, 7.0)]).unwrap();
        assert_eq!(single.x_bounds, [0.0, 1.0]);
        assert!(single.y_bounds[0] < 7.0 && single.y_bounds[1] > 7.0);
    }

    #[test]
    fn axis_amounts_are_compact() {
        assert_eq!(fmt_axis_amount(420.4), "420");
        assert_eq!(fmt_axis_amount(1_500.0), "1.5k");
        assert_eq!(fmt_axis_amount(35_000.0), "35k");
        assert_eq!(fmt_axis_amount(2_260_000.0), "2.3M");
    }

    #[test]
    fn range_keys() {
        let mut app = App::new(IngestConfig::default(), Services::unconfigured("test"));
        assert_eq!(app.range, RangeKind::Year);

        assert!(!app.handle_key(KeyCode::Right));
        assert_eq!(app.range, RangeKind::All);
        assert!(!app.handle_key(KeyCode::Char('1')));
        assert_eq!(app.range, RangeKind::Month);
        assert!(!app.handle_key(KeyCode::Left));
        assert_eq!(app.range, RangeKind::All);
        assert!(!app.handle_key(KeyCode::Char('2')));
        assert_eq!(app.range, RangeKind::SixMonths);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    fn voting_app() -> App {
        let services = Services::new(
            std::sync::Arc::new(crate::collab::InMemoryAuth::new()),
            std::sync::Arc::new(crate::collab::InMemoryVoteStore::new()),
        );
        App::new(IngestConfig::default(), services)
    }

    fn type_keys(app: &mut App, text: &str) {
        for c in text.chars() {
            assert!(!app.handle_key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn voting_needs_sign_in_and_counts_once() {
        let mut app = voting_app();

        app.handle_key(KeyCode::Char('y'));
        assert_eq!(app.status, "Sign in to vote (press a).");

        app.handle_key(KeyCode::Char('a'));
        assert!(app.auth_form.is_some());
        // Keys go to the form, so `q` is typed instead of quitting.
        app.handle_key(KeyCode::F(2));
        type_keys(&mut app, "q@example.com");
        app.handle_key(KeyCode::Enter);
        type_keys(&mut app, "pw");
        assert!(!app.handle_key(KeyCode::Enter));

        assert!(app.auth_form.is_none());
        assert_eq!(app.status, "Signed in as q@example.com.");

        app.handle_key(KeyCode::Char('y'));
        assert_eq!(app.status, "Thanks, your vote was recorded.");
        assert_eq!(app.my_vote, Some(VoteChoice::Yes));
        assert_eq!(app.tally, Some(VoteTally { yes: 1, no: 0, total: 1 }));

        app.handle_key(KeyCode::Char('n'));
        assert!(app.status.contains("already voted"));
        assert_eq!(app.tally, Some(VoteTally { yes: 1, no: 0, total: 1 }));

        app.handle_key(KeyCode::Char('o'));
        assert_eq!(app.status, "Signed out.");
        assert!(app.my_vote.is_none());
    }

    #[test]
    fn failed_sign_in_keeps_the_form_open() {
        let mut app = voting_app();
        app.handle_key(KeyCode::Char('a'));
        type_keys(&mut app, "nobody@example.com");
        app.handle_key(KeyCode::Enter);
        type_keys(&mut app, "pw");
        app.handle_key(KeyCode::Enter);

        let form = app.auth_form.as_ref().unwrap();
        assert!(form.password.is_empty());
        assert!(app.auth_error.is_some());

        app.handle_key(KeyCode::Esc);
        assert!(app.auth_form.is_none());
        assert!(app.services.current_user().is_none());
    }

    #[test]
    fn offline_backend_reports_instead_of_prompting() {
        let mut app = App::new(IngestConfig::default(), Services::unconfigured("missing keys"));
        app.handle_key(KeyCode::Char('a'));
        assert!(app.auth_form.is_none());
        assert!(app.status.contains("missing keys"));

        app.handle_key(KeyCode::Char('n'));
        assert_eq!(app.status, "Voting unavailable: missing keys");
    }

    #[test]
    fn session_events_reach_the_dashboard_state() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("sales.csv");
        fs::write(&csv, "YEAR,MONTH,RETAIL SALES,WAREHOUSE SALES\n2021,1,1,2\n2021,2,3,4\n").unwrap();

        let config = IngestConfig {
            csv: crate::domain::SourceLocation::Path(csv),
            summary: None,
            ..IngestConfig::default()
        };
        let mut app = App::new(config, Services::unconfigured("test"));
        app.reload();
        assert!(app.state.loading());

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while app.state.loading() && std::time::Instant::now() < deadline {
            app.pump();
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(!app.state.loading());
        assert!(app.state.error().is_none());
        assert_eq!(app.state.series().len(), 2);
        assert_eq!(app.status, "Loaded 2 periods.");
        assert_eq!(app.state.latest_month_key().map(|k| k.as_str()), Some("2021-02"));
    }
}
