//! Rolling history sparklines.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Sparkline},
};

/// The newest samples that fit in `width` columns, as sparkline bars.
pub fn visible_points(hist: &[f64], width: usize) -> Vec<u64> {
    let start = hist.len().saturating_sub(width);
    hist[start..]
        .iter()
        .map(|v| v.clamp(0.0, 100.0).round() as u64)
        .collect()
}

pub fn draw_history(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    hist: &[f64],
    color: Color,
) {
    let now = hist.last().copied().unwrap_or(0.0);
    let data = visible_points(hist, area.width.saturating_sub(2) as usize);
    let spark = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{title} (now: {now:>5.1}%)")),
        )
        .data(&data)
        .max(100)
        .style(Style::default().fg(color));
    f.render_widget(spark, area);
}
