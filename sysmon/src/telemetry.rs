//! Render-ready view state fed by the ingestion worker.
//!
//! The worker is the only writer. Renderers pull [`Telemetry::series`] and
//! [`Telemetry::animated_value`] at their own cadence; each piece of state sits
//! behind its own short-lived lock, so neither side waits on the other for
//! longer than a copy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use parking_lot::RwLock;

use crate::history::HistoryStore;
use crate::smoother::Smoother;
use crate::supervisor::SupervisorState;
use crate::types::{Metric, Snapshot};

/// Callbacks fired by the ingestion worker, in arrival order.
pub trait TelemetryObserver: Send + Sync {
    fn on_snapshot(&self, _snapshot: &Snapshot) {}
    fn on_status(&self, _state: &SupervisorState) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub frames_ok: u64,
    pub frames_malformed: u64,
    pub collector_failures: u64,
}

pub struct Telemetry {
    history: HistoryStore,
    smoother: Smoother,
    latest: RwLock<Option<Snapshot>>,
    last_good: RwLock<Option<(Snapshot, DateTime<Local>)>>,
    observers: RwLock<Vec<Arc<dyn TelemetryObserver>>>,
    frames_ok: AtomicU64,
    frames_malformed: AtomicU64,
    collector_failures: AtomicU64,
}

impl Telemetry {
    pub fn new(history_capacity: usize, animation: Duration) -> Self {
        Self {
            history: HistoryStore::new(history_capacity),
            smoother: Smoother::new(animation, Instant::now()),
            latest: RwLock::new(None),
            last_good: RwLock::new(None),
            observers: RwLock::new(Vec::new()),
            frames_ok: AtomicU64::new(0),
            frames_malformed: AtomicU64::new(0),
            collector_failures: AtomicU64::new(0),
        }
    }

    pub fn register(&self, observer: Arc<dyn TelemetryObserver>) {
        self.observers.write().push(observer);
    }

    /// Apply one validated Snapshot.
    ///
    /// Failed records are stored and announced but leave history and gauges
    /// at their last good values.
    pub fn ingest(&self, snapshot: Snapshot, now: Instant) {
        self.frames_ok.fetch_add(1, Ordering::Relaxed);
        if snapshot.ok {
            for metric in Metric::ALL {
                let v = snapshot.metric(metric);
                self.history.push(metric, v);
                self.smoother.set_target(metric, v, now);
            }
            *self.last_good.write() = Some((snapshot.clone(), Local::now()));
        } else {
            self.collector_failures.fetch_add(1, Ordering::Relaxed);
        }
        for observer in self.observers.read().iter() {
            observer.on_snapshot(&snapshot);
        }
        *self.latest.write() = Some(snapshot);
    }

    pub fn record_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn publish_status(&self, state: &SupervisorState) {
        for observer in self.observers.read().iter() {
            observer.on_status(state);
        }
    }

    pub fn series(&self, metric: Metric) -> Vec<f64> {
        self.history.snapshot(metric)
    }

    pub fn animated_value(&self, metric: Metric, now: Instant) -> f64 {
        self.smoother.value_at(metric, now)
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.latest.read().clone()
    }

    pub fn last_good(&self) -> Option<Snapshot> {
        self.last_good.read().as_ref().map(|(s, _)| s.clone())
    }

    /// Wall-clock time the last good Snapshot arrived.
    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.last_good.read().as_ref().map(|(_, at)| *at)
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            frames_ok: self.frames_ok.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            collector_failures: self.collector_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new(crate::history::DEFAULT_CAPACITY, crate::smoother::DEFAULT_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        snapshots: Mutex<Vec<Snapshot>>,
        statuses: Mutex<Vec<SupervisorState>>,
    }

    impl TelemetryObserver for Recorder {
        fn on_snapshot(&self, snapshot: &Snapshot) {
            self.snapshots.lock().push(snapshot.clone());
        }
        fn on_status(&self, state: &SupervisorState) {
            self.statuses.lock().push(state.clone());
        }
    }

    fn good(cpu: f64) -> Snapshot {
        Snapshot {
            ok: true,
            cpu_percent: cpu,
            mem_used_percent: cpu / 2.0,
            ..Snapshot::default()
        }
    }

    #[test]
    fn good_snapshot_feeds_history_and_gauges() {
        let t = Telemetry::new(4, Duration::from_millis(100));
        let now = Instant::now();
        t.ingest(good(40.0), now);
        assert_eq!(t.series(Metric::Cpu), vec![0.0, 0.0, 0.0, 40.0]);
        assert_eq!(t.series(Metric::Ram), vec![0.0, 0.0, 0.0, 20.0]);
        assert_eq!(t.animated_value(Metric::Cpu, now + Duration::from_millis(100)), 40.0);
        assert!(t.last_update().is_some());
    }

    #[test]
    fn failure_keeps_previous_good_values() {
        let t = Telemetry::new(3, Duration::from_millis(100));
        let now = Instant::now();
        t.ingest(good(70.0), now);
        t.ingest(Snapshot::failed("sensor gone"), now);
        assert_eq!(t.series(Metric::Cpu), vec![0.0, 0.0, 70.0]);
        assert_eq!(t.animated_value(Metric::Cpu, now + Duration::from_secs(1)), 70.0);
        assert_eq!(t.last_good().map(|s| s.cpu_percent), Some(70.0));
        assert_eq!(t.latest().map(|s| s.ok), Some(false));
        assert_eq!(t.stats().collector_failures, 1);
        assert_eq!(t.stats().frames_ok, 2);
    }

    #[test]
    fn observers_see_every_snapshot_in_order() {
        let t = Telemetry::default();
        let rec = Arc::new(Recorder::default());
        t.register(rec.clone());
        let now = Instant::now();
        t.ingest(good(1.0), now);
        t.ingest(Snapshot::failed("x"), now);
        t.ingest(good(3.0), now);
        let seen: Vec<_> = rec.snapshots.lock().iter().map(|s| s.ok).collect();
        assert_eq!(seen, vec![true, false, true]);
        t.publish_status(&SupervisorState::Running);
        assert_eq!(*rec.statuses.lock(), vec![SupervisorState::Running]);
    }
}
