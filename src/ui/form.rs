use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::form::{FormField, FormStep, SessionForm};

const LABEL_WIDTH: usize = 20;

/// "1 Basics > 2 Schedule > 3 Settings" with the current step highlighted.
pub fn step_indicator(current: FormStep) -> Line<'static> {
    let steps = FormStep::ALL.iter().map(|step| {
        let style = if *step == current {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        Span::styled(format!("{} {}", step.index() + 1, step), style)
    });
    Line::from(Itertools::intersperse(steps, Span::raw("  >  ")).collect::<Vec<_>>())
}

fn is_choice(field: FormField) -> bool {
    !matches!(
        field,
        FormField::ClassName | FormField::Group | FormField::Notes
    )
}

pub fn field_lines(form: &SessionForm) -> Vec<Line<'static>> {
    form.step()
        .fields()
        .iter()
        .map(|&field| {
            let focused = field == form.focused();
            let label_style = if focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let value = form.value(field);
            let value = match (focused, is_choice(field)) {
                (true, true) => format!("< {value} >"),
                (true, false) => format!("{value}_"),
                (false, _) => value,
            };
            Line::from(vec![
                Span::styled(
                    format!("{:<width$}", field.to_string(), width = LABEL_WIDTH),
                    label_style,
                ),
                Span::styled(value, Style::default().add_modifier(Modifier::BOLD)),
            ])
        })
        .collect()
}

pub fn render_form(form: &SessionForm, error: Option<&str>, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(super::HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    f.render_widget(
        Paragraph::new(step_indicator(form.step())).alignment(Alignment::Center),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new(field_lines(form))
            .block(Block::default().borders(Borders::ALL).title(format!(" {} ", form.step()))),
        chunks[1],
    );
    if let Some(error) = error {
        f.render_widget(
            Paragraph::new(Span::styled(
                error.to_string(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            chunks[2],
        );
    }
    let next = if form.step() == FormStep::Settings {
        "(enter) start session"
    } else {
        "(enter) next"
    };
    f.render_widget(
        Paragraph::new(Span::styled(
            format!("(tab) field / (←→) change / {next} / (esc) back"),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        chunks[3],
    );
}
