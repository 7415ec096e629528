//! Network throughput line.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

use crate::types::Snapshot;
use crate::ui::util::fmt_speed;

pub fn net_label(m: Option<&Snapshot>) -> String {
    match m {
        Some(m) => format!(
            "↓ {}   ↑ {}",
            fmt_speed(m.net_down_kbps),
            fmt_speed(m.net_up_kbps)
        ),
        None => "—".into(),
    }
}

pub fn draw_net(f: &mut ratatui::Frame<'_>, area: Rect, m: Option<&Snapshot>) {
    let p = Paragraph::new(net_label(m))
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL).title("Network"));
    f.render_widget(p, area);
}
