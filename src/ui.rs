pub mod form;
pub mod live;
pub mod screen;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::screen::current_screen;

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

fn navbar(app: &App) -> Paragraph<'static> {
    let mut spans = vec![
        Span::styled(
            " Rollcall ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            app.route.title(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(identity) = app.teacher.as_ref().or(app.admin.as_ref()) {
        spans.push(Span::styled(
            format!("   signed in as {}", identity.login),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    if app.live.as_ref().is_some_and(|live| live.is_active()) {
        spans.push(Span::styled(
            "   ● live",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM))
}

/// Draw the whole frame for the current route.
pub fn draw(app: &App, f: &mut Frame) {
    let area = f.area();
    let body = if app.route.shows_navbar() {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(1)])
            .split(area);
        f.render_widget(navbar(app), chunks[0]);
        chunks[1]
    } else {
        area
    };

    if body.width < 20 || body.height < 5 {
        f.render_widget(
            Paragraph::new("Terminal too small").alignment(Alignment::Center),
            Rect { height: 1, ..body },
        );
        return;
    }

    current_screen(&app.route).render(app, f, body);
}
