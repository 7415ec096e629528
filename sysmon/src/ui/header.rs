//! Top header: title and the collector status line.

use chrono::{DateTime, Local};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::supervisor::SupervisorState;
use crate::ui::theme::MUTED;

/// While the collector is healthy the line shows when data last arrived;
/// otherwise it explains what is wrong.
pub fn status_line(state: &SupervisorState, last_update: Option<DateTime<Local>>) -> String {
    match (state, last_update) {
        (SupervisorState::Running, Some(at)) => at.format("Updated %H:%M:%S%.3f").to_string(),
        _ => state.status_text(),
    }
}

fn status_color(state: &SupervisorState) -> Color {
    match state {
        SupervisorState::Starting => MUTED,
        SupervisorState::Running => Color::Green,
        SupervisorState::Degraded(_) => Color::Yellow,
        SupervisorState::Stopped(_) => Color::Red,
    }
}

pub fn draw_header(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &SupervisorState,
    status: &str,
    refresh: &str,
) {
    let line = Line::from(vec![
        Span::styled("sysmon", Style::default().fg(Color::White)),
        Span::styled(
            format!(" — live system stats • {refresh} refresh  (press 'q' to quit)   "),
            Style::default().fg(MUTED),
        ),
        Span::styled(status.to_string(), Style::default().fg(status_color(state))),
    ]);
    f.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM)),
        area,
    );
}
