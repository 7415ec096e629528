//! App state and main loop: input handling, pulling view state, and drawing.

use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
    Terminal,
};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::supervisor::{CollectorSupervisor, SupervisorState};
use crate::telemetry::Telemetry;
use crate::types::Metric;
use crate::ui::{
    charts::draw_history,
    gauges::{draw_gauge, gauge_label},
    header::{draw_header, status_line},
    net::draw_net,
    processes::{draw_top_processes, processes_handle_key, viewport_rows},
    theme::{ACCENT, ACCENT_ALT},
};

// Redraw often enough for the gauge easing to look smooth.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

pub struct App {
    telemetry: Arc<Telemetry>,
    status: watch::Receiver<SupervisorState>,
    refresh_label: String,

    should_quit: bool,

    pub procs_scroll_offset: usize,
    last_procs_area: Option<Rect>,
}

impl App {
    pub fn new(
        telemetry: Arc<Telemetry>,
        status: watch::Receiver<SupervisorState>,
        interval: Duration,
    ) -> Self {
        let refresh_label = if interval.is_zero() {
            "single-shot".to_string()
        } else {
            format!("{}ms", interval.as_millis())
        };
        Self {
            telemetry,
            status,
            refresh_label,
            should_quit: false,
            procs_scroll_offset: 0,
            last_procs_area: None,
        }
    }

    /// Run the dashboard until the user quits, then stop the collector.
    pub async fn run(&mut self, supervisor: &CollectorSupervisor) -> anyhow::Result<()> {
        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal).await;

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        let state = supervisor.shutdown().await;
        tracing::info!(status = %state, "dashboard closed");
        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        let mut events = EventStream::new();
        let mut frames = tokio::time::interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                ev = events.next() => match ev {
                    Some(Ok(Event::Key(k))) => self.handle_key(k),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => self.should_quit = true,
                },
                _ = frames.tick() => {}
            }
            if self.should_quit {
                break;
            }
            terminal.draw(|f| self.draw(f, Instant::now()))?;
        }

        Ok(())
    }

    fn handle_key(&mut self, k: KeyEvent) {
        if k.kind != KeyEventKind::Press {
            return;
        }
        let ctrl_c = k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl_c || matches!(k.code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc) {
            self.should_quit = true;
            return;
        }
        if let Some(p_area) = self.last_procs_area {
            let total = self
                .telemetry
                .last_good()
                .map(|m| m.top_procs.len())
                .unwrap_or(0);
            processes_handle_key(&mut self.procs_scroll_offset, k, viewport_rows(p_area), total);
        }
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>, now: Instant) {
        let area = f.area();
        let state = self.status.borrow().clone();
        let last = self.telemetry.last_good();
        let status = status_line(&state, self.telemetry.last_update());

        // Root rows: header, gauges + history, top procs
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(15),
                Constraint::Min(6),
            ])
            .split(area);

        draw_header(f, rows[0], &state, &status, &self.refresh_label);

        let top_lr = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);

        // Left: one gauge per metric, then network
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(3),
            ])
            .split(top_lr[0]);
        for (i, metric) in Metric::ALL.into_iter().enumerate() {
            draw_gauge(
                f,
                left[i],
                metric,
                self.telemetry.animated_value(metric, now),
                gauge_label(metric, last.as_ref()),
                metric_color(metric),
            );
        }
        draw_net(f, left[3], last.as_ref());

        // Right: history per metric
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(top_lr[1]);
        for (i, metric) in Metric::ALL.into_iter().enumerate() {
            draw_history(
                f,
                right[i],
                metric.label(),
                &self.telemetry.series(metric),
                metric_color(metric),
            );
        }

        // Cache for input handlers
        self.last_procs_area = Some(rows[2]);
        draw_top_processes(f, rows[2], last.as_ref(), self.procs_scroll_offset);
    }
}

fn metric_color(metric: Metric) -> Color {
    match metric {
        Metric::Cpu => ACCENT,
        Metric::Ram => ACCENT_ALT,
        Metric::DiskActive => Color::Cyan,
    }
}
