//! Top processes table, in the collector's rank order, with a scrollbar.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::style::Modifier;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::types::Snapshot;
use crate::ui::theme::{ACCENT, SB_ARROW, SB_THUMB, SB_TRACK};
use crate::ui::util::{fmt_cpu, truncate_middle};

const COLS: [Constraint; 3] = [
    Constraint::Percentage(60), // Process
    Constraint::Length(12),     // RAM (MB)
    Constraint::Length(9),      // CPU (%)
];

// Rows visible in a table drawn into `area`: borders (2) + header (1).
pub fn viewport_rows(area: Rect) -> usize {
    area.height.saturating_sub(3) as usize
}

pub fn draw_top_processes(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    m: Option<&Snapshot>,
    scroll_offset: usize,
) {
    let procs = m.map(|mm| mm.top_procs.as_slice()).unwrap_or_default();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Top Processes ({})", procs.len()));
    f.render_widget(block, area);

    // Inner area and content area (reserve 2 columns for scrollbar)
    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    if inner.height < 1 || inner.width < 3 {
        return;
    }
    let content = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width.saturating_sub(2),
        height: inner.height,
    };

    let total_rows = procs.len();
    let viewport = viewport_rows(area);
    let max_off = total_rows.saturating_sub(viewport);
    let offset = scroll_offset.min(max_off);

    let name_width = (content.width as usize * 6 / 10).max(4);
    let rows = procs.iter().skip(offset).take(viewport).map(|p| {
        let cpu_fg = match p.cpu_percent {
            None => Color::DarkGray,
            Some(x) if x < 25.0 => Color::Green,
            Some(x) if x < 60.0 => Color::Yellow,
            Some(_) => Color::Red,
        };
        Row::new(vec![
            Cell::from(truncate_middle(&p.name, name_width)),
            Cell::from(Line::from(format!("{:.0}", p.ram_mb)).right_aligned()),
            Cell::from(Line::from(fmt_cpu(p.cpu_percent)).right_aligned())
                .style(Style::default().fg(cpu_fg)),
        ])
    });

    let header = Row::new(vec!["Process", "RAM (MB)", "CPU (%)"])
        .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    let table = Table::new(rows, COLS).header(header).column_spacing(1);
    f.render_widget(table, content);

    let scroll_area = Rect {
        x: inner.x + inner.width.saturating_sub(1),
        y: inner.y,
        width: 1,
        height: inner.height,
    };
    if scroll_area.height >= 3 {
        let track = (scroll_area.height - 2) as usize;
        let total = total_rows.max(1);
        let view = viewport.clamp(1, total);
        let max_off = total.saturating_sub(view);

        let thumb_len = (track * view).div_ceil(total).max(1).min(track);
        let thumb_top = if max_off == 0 {
            0
        } else {
            ((track - thumb_len) * offset + max_off / 2) / max_off
        };

        let mut lines: Vec<Line> = Vec::with_capacity(scroll_area.height as usize);
        lines.push(Line::from(Span::styled("▲", Style::default().fg(SB_ARROW))));
        for i in 0..track {
            if i >= thumb_top && i < thumb_top + thumb_len {
                lines.push(Line::from(Span::styled("█", Style::default().fg(SB_THUMB))));
            } else {
                lines.push(Line::from(Span::styled("│", Style::default().fg(SB_TRACK))));
            }
        }
        lines.push(Line::from(Span::styled("▼", Style::default().fg(SB_ARROW))));
        f.render_widget(Paragraph::new(lines), scroll_area);
    }
}

/// Handle keyboard scrolling (Up/Down/PageUp/PageDown/Home/End)
pub fn processes_handle_key(
    scroll_offset: &mut usize,
    key: KeyEvent,
    page_size: usize,
    total_rows: usize,
) {
    let page = page_size.max(1);
    match key.code {
        KeyCode::Up => *scroll_offset = scroll_offset.saturating_sub(1),
        KeyCode::Down => *scroll_offset = scroll_offset.saturating_add(1),
        KeyCode::PageUp => *scroll_offset = scroll_offset.saturating_sub(page),
        KeyCode::PageDown => *scroll_offset = scroll_offset.saturating_add(page),
        KeyCode::Home => *scroll_offset = 0,
        KeyCode::End => *scroll_offset = usize::MAX,
        _ => {}
    }
    let max_off = total_rows.saturating_sub(page_size);
    *scroll_offset = (*scroll_offset).min(max_off);
}
