//! Fixed-capacity history buffers for charts.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::types::{clamp_percent, Metric};

pub const DEFAULT_CAPACITY: usize = 120;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if dq.len() == cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

// Always exactly `cap` samples long: zero-filled at creation, then each push
// evicts the oldest.
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    samples: VecDeque<f64>,
    cap: usize,
}

impl SeriesBuffer {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        let mut samples = VecDeque::with_capacity(cap);
        samples.resize(cap, 0.0);
        Self { samples, cap }
    }

    pub fn push(&mut self, value: f64) {
        push_capped(&mut self.samples, clamp_percent(value), self.cap);
    }

    fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Oldest-first copy of the samples.
    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

/// One [`SeriesBuffer`] per [`Metric`], each behind its own lock so a render
/// reading one chart never waits on a push to another.
pub struct HistoryStore {
    series: [Mutex<SeriesBuffer>; 3],
}

impl HistoryStore {
    pub fn new(cap: usize) -> Self {
        Self {
            series: std::array::from_fn(|_| Mutex::new(SeriesBuffer::new(cap))),
        }
    }

    pub fn push(&self, metric: Metric, value: f64) {
        self.series[metric.index()].lock().push(value);
    }

    /// Full-length, oldest-first samples for `metric`.
    pub fn snapshot(&self, metric: Metric) -> Vec<f64> {
        self.series[metric.index()].lock().to_vec()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
