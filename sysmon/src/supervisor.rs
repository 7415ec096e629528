//! Collector process supervision.
//!
//! One worker task owns the child process. It reads stdout through a
//! [`FrameDecoder`] into [`validate::parse`] and on into [`Telemetry`], turns
//! stderr lines into soft status, polls liveness on a fixed tick, and runs the
//! termination sequence when asked. Status is published on a watch channel,
//! so any task can read it or call [`CollectorSupervisor::shutdown`] without
//! touching the child.
//!
//! A collector that dies is reported as [`SupervisorState::Stopped`] and is
//! never restarted.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::SupervisorError;
use crate::framing::{FrameDecoder, RawFrame};
use crate::telemetry::Telemetry;
use crate::validate::{self, excerpt};

pub const DEFAULT_LIVENESS: Duration = Duration::from_secs(1);
pub const DEFAULT_GRACE: Duration = Duration::from_millis(800);

/// Stderr text shown in the status line is cut to this many characters.
pub const STDERR_STATUS_LEN: usize = 90;

const READ_CHUNK: usize = 8 * 1024;
// slack on top of the two grace waits before shutdown() stops waiting
const SHUTDOWN_MARGIN: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedReason {
    /// More than one malformed frame in a row.
    Garbled,
    /// The collector wrote to stderr.
    Stderr(String),
    /// The collector sent an `ok:false` record.
    CollectorFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Exit code, None when killed by a signal.
    Exited(Option<i32>),
    SpawnFailed(String),
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Running,
    Degraded(DegradedReason),
    Stopped(StopReason),
}

impl SupervisorState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, SupervisorState::Stopped(_))
    }

    /// Legal moves of the lifecycle. `Stopped` is terminal and re-entering the
    /// current state is not a transition.
    pub fn can_transition_to(&self, next: &SupervisorState) -> bool {
        use SupervisorState::*;
        if self == next {
            return false;
        }
        match (self, next) {
            (Stopped(_), _) => false,
            (_, Starting) => false,
            (Starting, Running) => true,
            (Degraded(_), Running) => true,
            (Running, Running) => false,
            (_, Degraded(_)) => true,
            (_, Stopped(_)) => true,
        }
    }

    pub fn status_text(&self) -> String {
        match self {
            SupervisorState::Starting => "Starting collector…".into(),
            SupervisorState::Running => "Collector running".into(),
            SupervisorState::Degraded(DegradedReason::Garbled) => {
                "Collector output garbled; showing last good values".into()
            }
            SupervisorState::Degraded(DegradedReason::Stderr(text)) => text.clone(),
            SupervisorState::Degraded(DegradedReason::CollectorFailure(err)) => {
                format!("Collector error: {err}")
            }
            SupervisorState::Stopped(StopReason::Exited(Some(0))) => {
                "Collector not running (exited)".into()
            }
            SupervisorState::Stopped(StopReason::Exited(Some(code))) => {
                format!("Collector not running (exited with code {code})")
            }
            SupervisorState::Stopped(StopReason::Exited(None)) => {
                "Collector not running (killed by signal)".into()
            }
            SupervisorState::Stopped(StopReason::SpawnFailed(err)) => {
                format!("Collector not running (failed to start: {err})")
            }
            SupervisorState::Stopped(StopReason::Terminated) => "Collector stopped".into(),
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status_text())
    }
}

/// Program and arguments used to launch the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CollectorCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// `--stream <ms>`; a zero interval falls back to single-shot mode.
    pub fn streaming(program: impl Into<PathBuf>, interval: Duration) -> Self {
        let cmd = Self::new(program);
        if interval.is_zero() {
            return cmd;
        }
        cmd.arg("--stream").arg(interval.as_millis().to_string())
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn display_name(&self) -> String {
        self.program.display().to_string()
    }

    fn spawn(&self) -> Result<Child, SupervisorError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SupervisorError::spawn(self.display_name(), e))
    }
}

impl fmt::Display for CollectorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SupervisorTiming {
    /// Period of the liveness check.
    pub liveness: Duration,
    /// Wait after the polite termination request, and again after the kill.
    pub grace: Duration,
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            liveness: DEFAULT_LIVENESS,
            grace: DEFAULT_GRACE,
        }
    }
}

/// Handle to a running collector and its ingestion worker.
pub struct CollectorSupervisor {
    status: watch::Receiver<SupervisorState>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    timing: SupervisorTiming,
}

impl CollectorSupervisor {
    /// Launch `command` and start ingesting into `telemetry`.
    ///
    /// Must be called from within a tokio runtime. Never fails: a collector
    /// that cannot be started shows up as `Stopped(SpawnFailed)`.
    pub fn start(
        command: CollectorCommand,
        telemetry: Arc<Telemetry>,
        timing: SupervisorTiming,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(SupervisorState::Starting);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let cell = StatusCell {
            tx: status_tx,
            telemetry: telemetry.clone(),
        };
        cell.telemetry.publish_status(&SupervisorState::Starting);
        info!(collector = %command, "starting collector");
        let worker = tokio::spawn(supervise(command, cell, timing, shutdown_rx));
        Self {
            status: status_rx,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            worker: Mutex::new(Some(worker)),
            timing,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.status.clone()
    }

    /// Resolve once the collector has stopped for any reason.
    pub async fn wait_stopped(&self) -> SupervisorState {
        let mut rx = self.status.clone();
        if rx.wait_for(SupervisorState::is_stopped).await.is_err() {
            // worker gone without reporting; treat as stopped
            return SupervisorState::Stopped(StopReason::Terminated);
        }
        self.state()
    }

    /// Terminate the collector: polite request, grace wait, kill, grace wait.
    ///
    /// Safe from any task and idempotent. Only the first call drives the
    /// sequence, but every caller waits for it to reach `Stopped`, for at
    /// most about twice the grace period.
    pub async fn shutdown(&self) -> SupervisorState {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
        let bound = self.timing.grace * 2 + SHUTDOWN_MARGIN;
        let state = match timeout(bound, self.wait_stopped()).await {
            Ok(state) => state,
            Err(_) => {
                warn!("collector shutdown did not finish within {bound:?}; giving up");
                return self.state();
            }
        };
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            // already past its last status update
            if let Err(e) = worker.await {
                debug!("collector worker ended abnormally: {e}");
            }
        }
        state
    }
}

struct StatusCell {
    tx: watch::Sender<SupervisorState>,
    telemetry: Arc<Telemetry>,
}

impl StatusCell {
    fn get(&self) -> SupervisorState {
        self.tx.borrow().clone()
    }

    fn set(&self, next: SupervisorState) -> bool {
        let changed = self.tx.send_if_modified(|cur| {
            if cur.can_transition_to(&next) {
                *cur = next.clone();
                true
            } else {
                false
            }
        });
        if changed {
            info!(status = %next, "collector status changed");
            self.telemetry.publish_status(&next);
        }
        changed
    }

    // Watchdog tick: remind observers of a still-active soft failure.
    fn reassert(&self) {
        let cur = self.get();
        if matches!(cur, SupervisorState::Degraded(_)) {
            debug!(status = %cur, "collector still degraded");
            self.telemetry.publish_status(&cur);
        }
    }
}

// Frame handling kept apart from the decoder so both can be borrowed at once.
struct Router<'a> {
    status: &'a StatusCell,
    garbled: u32,
}

impl Router<'_> {
    fn accept(&mut self, frame: RawFrame) {
        match validate::parse(&frame) {
            Ok(snapshot) => {
                self.garbled = 0;
                let next = if snapshot.ok {
                    SupervisorState::Running
                } else {
                    let err = snapshot.error.clone().unwrap_or_default();
                    warn!(error = %err, "collector reported failure");
                    SupervisorState::Degraded(DegradedReason::CollectorFailure(err))
                };
                self.status
                    .telemetry
                    .ingest(snapshot, std::time::Instant::now());
                self.status.set(next);
            }
            Err(e) => {
                self.garbled += 1;
                self.status.telemetry.record_malformed();
                warn!(consecutive = self.garbled, "dropping {e}");
                if self.garbled > 1 {
                    self.status
                        .set(SupervisorState::Degraded(DegradedReason::Garbled));
                }
            }
        }
    }
}

struct Ingest<'a> {
    decoder: FrameDecoder,
    router: Router<'a>,
    seen_output: bool,
}

impl<'a> Ingest<'a> {
    fn new(status: &'a StatusCell) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            router: Router { status, garbled: 0 },
            seen_output: false,
        }
    }

    fn feed(&mut self, bytes: &[u8]) {
        if !self.seen_output {
            self.seen_output = true;
            if self.router.status.get() == SupervisorState::Starting {
                self.router.status.set(SupervisorState::Running);
            }
        }
        for frame in self.decoder.feed(bytes) {
            self.router.accept(frame);
        }
    }

    fn finish(&mut self) {
        let pending = self.decoder.pending();
        if let Some(frame) = self.decoder.finish() {
            debug!(pending, "flushing unterminated final frame");
            self.router.accept(frame);
        }
    }
}

async fn supervise(
    command: CollectorCommand,
    status: StatusCell,
    timing: SupervisorTiming,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("{e}");
            status.set(SupervisorState::Stopped(StopReason::SpawnFailed(
                e.to_string(),
            )));
            return;
        }
    };
    let (mut stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
        (Some(out), Some(err)) => (out, err),
        (out, _) => {
            let pipe = if out.is_none() { "stdout" } else { "stderr" };
            let e = SupervisorError::missing_pipe(command.display_name(), pipe);
            warn!("{e}");
            terminate(&mut child, timing.grace).await;
            status.set(SupervisorState::Stopped(StopReason::SpawnFailed(
                e.to_string(),
            )));
            return;
        }
    };
    debug!(pid = child.id(), "collector spawned");

    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut ingest = Ingest::new(&status);
    let mut buf = vec![0u8; READ_CHUNK];
    let mut stdout_open = true;
    let mut stderr_open = true;
    let mut awaiting_exit = false;
    let mut liveness = interval_at(Instant::now() + timing.liveness, timing.liveness);
    liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("collector shutdown requested");
                terminate(&mut child, timing.grace).await;
                status.set(SupervisorState::Stopped(StopReason::Terminated));
                return;
            }
            read = stdout.read(&mut buf), if stdout_open => match read {
                Ok(0) => {
                    debug!("collector stdout closed");
                    stdout_open = false;
                    awaiting_exit = true;
                    ingest.finish();
                }
                Ok(n) => ingest.feed(&buf[..n]),
                Err(e) => {
                    warn!("reading collector stdout failed: {e}");
                    stdout_open = false;
                    awaiting_exit = true;
                }
            },
            // stdout is gone; the exit normally follows right behind
            exit = child.wait(), if awaiting_exit => match exit {
                Ok(exit) => {
                    status.set(SupervisorState::Stopped(StopReason::Exited(exit.code())));
                    return;
                }
                Err(e) => {
                    warn!("waiting for collector failed: {e}");
                    awaiting_exit = false;
                }
            },
            line = stderr_lines.next_line(), if stderr_open => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        warn!(target: "collector", "{}", excerpt(line));
                        let shown: String = line.chars().take(STDERR_STATUS_LEN).collect();
                        status.set(SupervisorState::Degraded(DegradedReason::Stderr(shown)));
                    }
                }
                Ok(None) => stderr_open = false,
                Err(e) => {
                    debug!("reading collector stderr failed: {e}");
                    stderr_open = false;
                }
            },
            _ = liveness.tick() => match child.try_wait() {
                Ok(Some(exit)) => {
                    if stdout_open {
                        drain(&mut stdout, &mut ingest, timing.grace).await;
                    }
                    status.set(SupervisorState::Stopped(StopReason::Exited(exit.code())));
                    return;
                }
                Ok(None) => status.reassert(),
                Err(e) => warn!("collector liveness check failed: {e}"),
            },
        }
    }
}

// Collect whatever an already-exited collector left in the pipe.
async fn drain(stdout: &mut ChildStdout, ingest: &mut Ingest<'_>, grace: Duration) {
    let mut rest = Vec::new();
    if let Err(e) = timeout(grace, stdout.read_to_end(&mut rest)).await {
        debug!("stdout drain timed out: {e}");
    }
    if !rest.is_empty() {
        ingest.feed(&rest);
    }
    ingest.finish();
}

async fn terminate(child: &mut Child, grace: Duration) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = request_exit(child) {
        debug!("termination request failed: {e}");
    }
    match timeout(grace, child.wait()).await {
        Ok(Ok(exit)) => {
            debug!(?exit, "collector exited after termination request");
            return;
        }
        Ok(Err(e)) => warn!("waiting for collector failed: {e}"),
        Err(_) => warn!("collector ignored termination request; killing"),
    }
    if let Err(e) = child.start_kill() {
        warn!("killing collector failed: {e}");
    }
    if timeout(grace, child.wait()).await.is_err() {
        warn!("collector still alive after kill; giving up");
    }
}

#[cfg(unix)]
fn request_exit(child: &mut Child) -> Result<(), SupervisorError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from)?;
    Ok(())
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) -> Result<(), SupervisorError> {
    child.start_kill()?;
    Ok(())
}
