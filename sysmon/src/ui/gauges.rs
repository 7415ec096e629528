//! Smoothed CPU / RAM / disk-active gauges.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Gauge},
};

use crate::types::{Metric, Snapshot};

/// Text under each gauge, from the last good Snapshot.
pub fn gauge_label(metric: Metric, m: Option<&Snapshot>) -> String {
    let Some(m) = m else {
        return format!("{}: —", metric.label());
    };
    match metric {
        Metric::Cpu => format!("CPU: {:.1}%", m.cpu_percent),
        Metric::Ram => format!(
            "RAM: {} / {} MB ({:.1}%)",
            m.mem_used_mb, m.mem_total_mb, m.mem_used_percent
        ),
        Metric::DiskActive => format!(
            "Disk: Active {:.1}%  •  {:.1}/{:.1} GB (Free {:.1} GB)",
            m.disk_active_percent, m.disk_used_gb, m.disk_total_gb, m.disk_free_gb
        ),
    }
}

pub fn draw_gauge(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    metric: Metric,
    value: f64,
    label: String,
    color: Color,
) {
    let ratio = (value / 100.0).clamp(0.0, 1.0);
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(metric.label()))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(label);
    f.render_widget(g, area);
}
