use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, ADMIN_MENU, HOME_MENU};
use crate::auth::Role;
use crate::config::SettingsField;
use crate::routes::Route;
use crate::scan::{ScanOutcome, ScanPhase};
use crate::summary::SessionSummary;
use crate::ui::{form::render_form, live::render_live, HORIZONTAL_MARGIN, VERTICAL_MARGIN};

/// A UI Screen boundary: renders one route into the area below the navbar.
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect);
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn notice_line(app: &App) -> Line<'static> {
    match &app.notice {
        Some(notice) => Line::from(Span::styled(notice.clone(), Style::default().fg(Color::Cyan))),
        None => Line::from(""),
    }
}

pub struct HomeScreen;

impl Screen for HomeScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(Span::styled("Attendance, one scan at a time", italic())),
            Line::from(""),
        ];
        for (idx, item) in HOME_MENU.iter().enumerate() {
            let label = match idx {
                0 if app.live.is_some() => "Teacher (session running)",
                _ => *item,
            };
            lines.push(if idx == app.home_selection {
                Line::from(Span::styled(
                    format!("> {label}"),
                    bold().fg(Color::Cyan),
                ))
            } else {
                Line::from(format!("  {label}"))
            });
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("(↑↓) choose / (enter) open / (q)uit", italic())));

        let rect = centered(area, 44, lines.len() as u16);
        f.render_widget(Paragraph::new(lines).alignment(Alignment::Left), rect);
    }
}

pub struct LoginScreen {
    pub role: Role,
}

impl Screen for LoginScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        let login_label = match self.role {
            Role::Teacher => "Email",
            Role::Admin => "Admin ID",
        };
        let field = |label: &str, value: String, focused: bool| {
            let style = if focused {
                bold().fg(Color::Cyan)
            } else {
                Style::default()
            };
            let cursor = if focused { "_" } else { "" };
            Line::from(vec![
                Span::styled(format!("{label:<10}"), style),
                Span::raw(format!("{value}{cursor}")),
            ])
        };

        let mut lines = vec![
            field(
                login_label,
                app.login.credentials.login.clone(),
                !app.login.focus_password,
            ),
            field(
                "Password",
                "*".repeat(app.login.credentials.password.chars().count()),
                app.login.focus_password,
            ),
            Line::from(""),
        ];
        if let Some(error) = &app.login.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                bold().fg(Color::Red),
            )));
        }
        lines.push(Line::from(Span::styled(
            "(tab) switch field / (enter) sign in / (esc) back",
            italic(),
        )));

        let rect = centered(area, 56, lines.len() as u16 + 2);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} sign in ", self.role));
        f.render_widget(Paragraph::new(lines).block(block), rect);
    }
}

pub struct CreateSessionScreen;

impl Screen for CreateSessionScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        render_form(&app.form, app.form_error.as_deref(), f, area);
    }
}

pub struct LiveSessionScreen;

impl Screen for LiveSessionScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        render_live(app, f, area);
    }
}

/// Tally plus the per-roll attendance table, shared by the teacher and admin views.
fn summary_lines(summary: &SessionSummary) -> Vec<Line<'static>> {
    let tally = summary.tally();
    let config = &summary.config;
    let mut details = vec![config.date.format("%Y-%m-%d").to_string()];
    details.push(format!("{}-{}", config.start, config.end));
    details.push(config.session_type.to_string());
    if let Some(group) = &config.group {
        details.push(group.clone());
    }

    vec![
        Line::from(Span::styled(config.title().to_string(), bold())),
        Line::from(Span::styled(details.join(" · "), italic())),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{} present", tally.present), bold().fg(Color::Green)),
            Span::raw("   "),
            Span::styled(format!("{} absent", tally.absent()), bold().fg(Color::Red)),
            Span::raw(format!("   {}% attendance", tally.percentage())),
        ]),
        Line::from(Span::styled(format!("Session {}", summary.end_reason), italic())),
    ]
}

fn attendance_table(summary: &SessionSummary) -> Table<'static> {
    let rows = (1..=summary.config.expected_students).map(|roll| {
        let (status, color) = if summary.marked.contains(&roll) {
            ("Present", Color::Green)
        } else {
            ("Absent", Color::DarkGray)
        };
        Row::new(vec![
            Cell::from(roll.to_string()),
            Cell::from(status).style(Style::default().fg(color)),
        ])
    });
    Table::new(rows, [Constraint::Length(12), Constraint::Length(10)])
        .header(Row::new(vec!["Roll Number", "Status"]).style(bold()))
        .block(Block::default().borders(Borders::TOP))
}

fn render_summary(summary: &SessionSummary, legend: &str, app: &App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    f.render_widget(Paragraph::new(summary_lines(summary)), chunks[0]);
    f.render_widget(attendance_table(summary), chunks[1]);
    f.render_widget(Paragraph::new(notice_line(app)), chunks[2]);
    f.render_widget(Paragraph::new(Span::styled(legend.to_string(), italic())), chunks[3]);
}

pub struct SummaryScreen {
    pub session: usize,
}

impl Screen for SummaryScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        match app.archive.get(self.session) {
            Some(summary) => render_summary(
                summary,
                "(n)ew session / e(x)port again / (esc) home",
                app,
                f,
                area,
            ),
            None => f.render_widget(Paragraph::new("No such session"), area),
        }
    }
}

pub struct StudentEntryScreen;

impl Screen for StudentEntryScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Roll number  ", bold()),
                Span::raw(format!("{}_", app.student.roll_input)),
            ]),
            Line::from(""),
        ];
        if let Some(error) = &app.student.error {
            lines.push(Line::from(Span::styled(error.clone(), bold().fg(Color::Red))));
        }
        lines.push(Line::from(Span::styled(
            "(enter) continue to scan / (esc) back",
            italic(),
        )));
        let rect = centered(area, 48, lines.len() as u16 + 2);
        f.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Student ")),
            rect,
        );
    }
}

pub struct StudentScanScreen {
    pub roll: u32,
}

fn outcome_style(outcome: ScanOutcome) -> Style {
    if outcome.is_success() {
        bold().fg(Color::Green)
    } else if outcome.is_terminal() {
        bold().fg(Color::Red)
    } else {
        bold().fg(Color::Yellow)
    }
}

impl Screen for StudentScanScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(Span::styled(format!("Roll {}", self.roll), bold())),
            Line::from(""),
        ];
        match app.student.attempt.as_ref().map(|a| (a.phase(), a.can_scan())) {
            Some((ScanPhase::Scanning, _)) | None => {
                lines.push(Line::from(vec![
                    Span::raw("Code shown on the teacher's screen  "),
                    Span::styled(format!("{}_", app.student.code_input), bold()),
                ]));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled("(enter) scan / (esc) back", italic())));
            }
            Some((ScanPhase::Loading, _)) => {
                lines.push(Line::from(Span::styled("Checking code...", italic())));
            }
            Some((ScanPhase::Done(outcome), can_retry)) => {
                lines.push(Line::from(Span::styled(outcome.title(), outcome_style(outcome))));
                lines.push(Line::from(outcome.message()));
                lines.push(Line::from(""));
                let legend = if can_retry {
                    "(r)etry / (esc) back"
                } else {
                    "(esc) back"
                };
                lines.push(Line::from(Span::styled(legend, italic())));
            }
        }

        let rect = centered(area, 64, lines.len() as u16 + 2);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Scan QR Code ");
        f.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block),
            rect,
        );
    }
}

pub struct AdminSessionsScreen {
    pub selected: Option<usize>,
}

impl Screen for AdminSessionsScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        let area = Rect {
            y: area.y + VERTICAL_MARGIN.min(area.height),
            height: area.height.saturating_sub(VERTICAL_MARGIN),
            ..area
        };

        if let Some(summary) = self.selected.and_then(|idx| app.archive.get(idx)) {
            let legend = if app.roll_input.is_empty() {
                "digits + (enter) toggle roll / e(x)port / (esc) list".to_string()
            } else {
                format!("toggle roll: {}_  (enter) apply", app.roll_input)
            };
            render_summary(summary, &legend, app, f, area);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        if app.archive.is_empty() {
            f.render_widget(
                Paragraph::new(Span::styled("No sessions recorded yet", italic()))
                    .alignment(Alignment::Center),
                chunks[0],
            );
        } else {
            let rows = app.archive.sessions().iter().enumerate().map(|(idx, s)| {
                let tally = s.tally();
                let style = if idx == app.admin_selection {
                    bold().fg(Color::Cyan)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(s.config.title().to_string()),
                    Cell::from(s.config.date.format("%Y-%m-%d").to_string()),
                    Cell::from(s.config.start.to_string()),
                    Cell::from(format!("{}/{}", tally.present, tally.expected)),
                    Cell::from(s.end_reason.to_string()),
                ])
                .style(style)
            });
            let table = Table::new(
                rows,
                [
                    Constraint::Min(16),
                    Constraint::Length(12),
                    Constraint::Length(7),
                    Constraint::Length(9),
                    Constraint::Length(12),
                ],
            )
            .header(Row::new(vec!["Class", "Date", "Start", "Present", "Ended"]).style(bold()))
            .block(Block::default().borders(Borders::ALL).title(" Attendance Sessions "));
            f.render_widget(table, chunks[0]);
        }
        f.render_widget(
            Paragraph::new(Span::styled(
                "(↑↓) choose / (enter) open / (esc) dashboard",
                italic(),
            )),
            chunks[1],
        );
    }
}

pub struct AdminDashboardScreen;

impl Screen for AdminDashboardScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        let stats = app.dashboard_stats();
        let stat = |label: &str, value: usize| {
            Line::from(vec![
                Span::styled(format!("{value:>6}  "), bold().fg(Color::Green)),
                Span::raw(label.to_string()),
            ])
        };
        let mut lines = vec![
            Line::from(Span::styled(
                "Manage attendance, teachers, and system settings",
                italic(),
            )),
            Line::from(""),
            stat("Total Sessions", stats.sessions),
            stat("Students Marked", stats.students_marked),
            stat("Active Teachers", stats.teachers),
            Line::from(""),
        ];
        for (idx, item) in ADMIN_MENU.iter().enumerate() {
            lines.push(if idx == app.dashboard_selection {
                Line::from(Span::styled(format!("> {item}"), bold().fg(Color::Cyan)))
            } else {
                Line::from(format!("  {item}"))
            });
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "(↑↓) choose / (enter) open / (esc) home",
            italic(),
        )));

        let rect = centered(area, 52, lines.len() as u16);
        f.render_widget(Paragraph::new(lines), rect);
    }
}

pub struct AdminTeachersScreen;

impl Screen for AdminTeachersScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let rows = app.teacher_rows().into_iter().map(|row| {
            let status = if row.live {
                Span::styled("live", bold().fg(Color::Green))
            } else {
                Span::raw("")
            };
            Row::new(vec![
                Cell::from(row.login),
                Cell::from(row.sessions.to_string()),
                Cell::from(status),
            ])
        });
        let table = Table::new(
            rows,
            [
                Constraint::Min(24),
                Constraint::Length(9),
                Constraint::Length(6),
            ],
        )
        .header(Row::new(vec!["Email", "Sessions", ""]).style(bold()))
        .block(Block::default().borders(Borders::ALL).title(" Teachers "));
        f.render_widget(table, chunks[0]);
        f.render_widget(
            Paragraph::new(Span::styled("(esc) dashboard", italic())),
            chunks[1],
        );
    }
}

pub struct AdminSettingsScreen;

impl Screen for AdminSettingsScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        let editor = &app.settings_editor;
        let mut lines: Vec<Line> = SettingsField::ALL
            .iter()
            .map(|field| {
                let focused = *field == editor.focused();
                let style = if focused {
                    bold().fg(Color::Cyan)
                } else {
                    Style::default()
                };
                let marker = if focused { "> " } else { "  " };
                Line::from(vec![
                    Span::styled(format!("{marker}{:<38}", field.to_string()), style),
                    Span::styled(format!("< {} >", editor.value(*field)), bold()),
                ])
            })
            .collect();
        lines.push(Line::from(""));
        if editor.is_dirty() {
            lines.push(Line::from(Span::styled(
                "unsaved changes",
                Style::default().fg(Color::Yellow),
            )));
        } else {
            lines.push(notice_line(app));
        }
        lines.push(Line::from(Span::styled(
            "(↑↓) field / (←→) change / (enter) save / (esc) dashboard",
            italic(),
        )));

        let rect = centered(area, 64, lines.len() as u16 + 2);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" System Settings ");
        f.render_widget(Paragraph::new(lines).block(block), rect);
    }
}

/// Helper to construct the appropriate screen for the current route
pub fn current_screen(route: &Route) -> Box<dyn Screen> {
    match *route {
        Route::Home => Box::new(HomeScreen),
        Route::TeacherLogin => Box::new(LoginScreen {
            role: Role::Teacher,
        }),
        Route::AdminLogin => Box::new(LoginScreen { role: Role::Admin }),
        Route::CreateSession => Box::new(CreateSessionScreen),
        Route::LiveSession => Box::new(LiveSessionScreen),
        Route::SessionSummary { session } => Box::new(SummaryScreen { session }),
        Route::StudentEntry => Box::new(StudentEntryScreen),
        Route::StudentScan { roll } => Box::new(StudentScanScreen { roll }),
        Route::AdminDashboard => Box::new(AdminDashboardScreen),
        Route::AdminSessions { selected } => Box::new(AdminSessionsScreen { selected }),
        Route::AdminTeachers => Box::new(AdminTeachersScreen),
        Route::AdminSettings => Box::new(AdminSettingsScreen),
    }
}
