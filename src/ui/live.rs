use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::controller::LiveSession;
use crate::roll_grid::RollGrid;

/// Modules per side of the QR placeholder.
pub const QR_SIZE: usize = 21;
const CELL_WIDTH: usize = 5;
const FINDER: usize = 7;

/// Countdown line: normal, paused, warning, or ended.
pub fn timer_line(live: &LiveSession) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let clock = live.timer().display();

    if !live.is_active() {
        return Line::from(Span::styled("Session Ended", bold.fg(Color::Red)));
    }
    if live.is_paused() {
        return Line::from(vec![
            Span::styled(clock, bold.fg(Color::Yellow)),
            Span::styled("  paused", Style::default().add_modifier(Modifier::ITALIC)),
        ]);
    }
    if live.timer().is_warning() {
        return Line::from(vec![
            Span::styled(clock, bold.fg(Color::Red)),
            Span::styled("  Session ending soon!", bold.fg(Color::Red)),
        ]);
    }
    Line::from(Span::styled(clock, bold.fg(Color::Green)))
}

/// Deterministic block pattern standing in for a QR code.
///
/// Three finder squares sit in the corners like a real code; the rest is derived from `code`
/// so a rotated code visibly changes the picture.
pub fn qr_pattern(code: &str, size: usize) -> Vec<Vec<bool>> {
    let seed = code
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
            (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
        });

    (0..size)
        .map(|row| {
            (0..size)
                .map(|col| match finder_module(row, col, size) {
                    Some(dark) => dark,
                    None => {
                        let idx = (row * size + col) as u64;
                        let mut h = seed ^ idx.wrapping_mul(0x9e37_79b9_7f4a_7c15);
                        h ^= h >> 33;
                        h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
                        h ^= h >> 33;
                        h & 1 == 1
                    }
                })
                .collect()
        })
        .collect()
}

fn finder_module(row: usize, col: usize, size: usize) -> Option<bool> {
    let far = size.saturating_sub(FINDER);
    let corners = [(0, 0), (0, far), (far, 0)];
    corners.iter().find_map(|&(r0, c0)| {
        // one module of quiet border around each finder
        if row + 1 < r0 || col + 1 < c0 || row > r0 + FINDER || col > c0 + FINDER {
            return None;
        }
        let (r, c) = (row as isize - r0 as isize, col as isize - c0 as isize);
        if !(0..FINDER as isize).contains(&r) || !(0..FINDER as isize).contains(&c) {
            return Some(false);
        }
        let ring = r.min(c).min(FINDER as isize - 1 - r).min(FINDER as isize - 1 - c);
        Some(ring != 1)
    })
}

fn render_qr(live: &LiveSession, f: &mut Frame, area: Rect) {
    let dimmed = !live.is_active() || live.is_paused();
    let style = if dimmed {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
    } else {
        Style::default().fg(Color::White)
    };

    let mut lines: Vec<Line> = qr_pattern(live.code(), QR_SIZE)
        .into_iter()
        .map(|row| {
            let text: String = row
                .into_iter()
                .map(|dark| if dark { "██" } else { "  " })
                .collect();
            Line::from(Span::styled(text, style))
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("code {}", live.code()),
        style.add_modifier(Modifier::BOLD),
    )));

    let qr = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" Scan to mark attendance "));
    f.render_widget(qr, area);
}

fn center(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width());
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(pad - left))
}

/// Roll grid as styled lines, `columns` cells per row.
pub fn grid_lines(grid: &RollGrid, columns: usize) -> Vec<Line<'static>> {
    let present = Style::default()
        .fg(Color::Black)
        .bg(Color::Green)
        .add_modifier(Modifier::BOLD);
    let absent = if grid.is_interactive() {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    grid.rows(columns)
        .into_iter()
        .map(|row| {
            let spans: Vec<Span> = row
                .into_iter()
                .flat_map(|cell| {
                    let style = if cell.present { present } else { absent };
                    [
                        Span::styled(center(&cell.roll.to_string(), CELL_WIDTH - 1), style),
                        Span::raw(" "),
                    ]
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn render_grid(live: &LiveSession, f: &mut Frame, area: Rect) {
    let grid = live.grid();
    let tally = live.tally();
    let columns = (area.width.saturating_sub(2) as usize / CELL_WIDTH).max(1);
    let title = format!(" Roll numbers {}/{} ", tally.present, tally.expected);
    let widget = Paragraph::new(grid_lines(&grid, columns))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn render_feed(live: &LiveSession, f: &mut Frame, area: Rect) {
    let lines: Vec<Line> = live
        .feed()
        .rev()
        .map(|event| {
            let color = if event.outcome.is_success() {
                Color::Green
            } else {
                Color::Red
            };
            Line::from(vec![
                Span::styled(
                    format!("roll {:>4}  ", event.roll),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(event.outcome.title(), Style::default().fg(color)),
            ])
        })
        .collect();
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::TOP).title(" Recent scans "));
    f.render_widget(widget, area);
}

fn prompt_line(app: &App, live: &LiveSession) -> Line<'static> {
    let italic = Style::default().add_modifier(Modifier::ITALIC);
    if live.is_end_requested() {
        return Line::from(Span::styled(
            "End this session now? (y)es / (n)o",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }
    if !live.is_active() {
        return Line::from(Span::styled("(enter) view summary", italic));
    }
    if !app.roll_input.is_empty() {
        return Line::from(Span::styled(
            format!("toggle roll: {}_  (enter) apply", app.roll_input),
            Style::default().fg(Color::Cyan),
        ));
    }
    if let Some(notice) = &app.notice {
        return Line::from(Span::styled(notice.clone(), Style::default().fg(Color::Cyan)));
    }
    Line::from(Span::styled(
        "(p)ause / (r)otate code / (e)nd / (v) student view / digits + (enter) toggle roll",
        italic,
    ))
}

pub fn render_live(app: &App, f: &mut Frame, area: Rect) {
    let Some(live) = app.live.as_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // timer
            Constraint::Min(QR_SIZE as u16 / 2),
            Constraint::Length(6), // feed
            Constraint::Length(1), // prompt
        ])
        .split(area);

    let tally = live.tally();
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            live.config().title().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "   {} present / {} absent ({}%)",
            tally.present,
            tally.absent(),
            tally.percentage()
        )),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    f.render_widget(
        Paragraph::new(timer_line(live)).alignment(Alignment::Center),
        chunks[1],
    );

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(QR_SIZE as u16 * 2 + 2),
            Constraint::Min(CELL_WIDTH as u16 + 2),
        ])
        .split(chunks[2]);
    render_qr(live, f, middle[0]);
    render_grid(live, f, middle[1]);

    render_feed(live, f, chunks[3]);
    f.render_widget(
        Paragraph::new(prompt_line(app, live)).wrap(Wrap { trim: true }),
        chunks[4],
    );
}
