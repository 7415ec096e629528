//! Eased display values for the gauges.
//!
//! Nothing here runs on its own: callers pass `now` both when setting a target
//! and when sampling, so any render loop can drive it at whatever cadence.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::types::Metric;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(220);

/// Cubic ease-out, `1 - (1 - t)^3`, with `t` clamped to [0, 1].
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Clone, Copy)]
pub struct AnimatedValue {
    /// Interpolation origin for the running transition.
    pub current: f64,
    pub target: f64,
    pub started_at: Instant,
    pub duration: Duration,
}

impl AnimatedValue {
    pub fn new(value: f64, now: Instant, duration: Duration) -> Self {
        Self {
            current: value,
            target: value,
            started_at: now,
            duration,
        }
    }

    pub fn value_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed >= self.duration {
            return self.target;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.current + (self.target - self.current) * ease_out_cubic(t)
    }

    /// Retarget from wherever the value is at `now`, so a fast stream of
    /// updates never makes the display jump.
    pub fn set_target(&mut self, target: f64, now: Instant) {
        self.current = self.value_at(now);
        self.target = target;
        self.started_at = now;
    }
}

/// One [`AnimatedValue`] per [`Metric`].
pub struct Smoother {
    values: [Mutex<AnimatedValue>; 3],
}

impl Smoother {
    pub fn new(duration: Duration, now: Instant) -> Self {
        Self {
            values: std::array::from_fn(|_| Mutex::new(AnimatedValue::new(0.0, now, duration))),
        }
    }

    pub fn set_target(&self, metric: Metric, value: f64, now: Instant) {
        self.values[metric.index()].lock().set_target(value, now);
    }

    pub fn value_at(&self, metric: Metric, now: Instant) -> f64 {
        self.values[metric.index()].lock().value_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: Duration = Duration::from_millis(220);

    #[test]
    fn ease_curve_endpoints_and_shape() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-12);
        // ease-out: ahead of linear everywhere inside (0, 1)
        for i in 1..100 {
            let t = i as f64 / 100.0;
            assert!(ease_out_cubic(t) > t);
        }
    }

    #[test]
    fn reaches_target_at_duration_and_stays() {
        let t0 = Instant::now();
        let mut v = AnimatedValue::new(10.0, t0, D);
        v.set_target(80.0, t0);
        assert_eq!(v.value_at(t0), 10.0);
        assert_eq!(v.value_at(t0 + D), 80.0);
        assert_eq!(v.value_at(t0 + D * 5), 80.0);
    }

    #[test]
    fn monotonic_toward_target() {
        let t0 = Instant::now();
        for (from, to) in [(0.0, 100.0), (90.0, 5.0)] {
            let mut v = AnimatedValue::new(from, t0, D);
            v.set_target(to, t0);
            let mut prev = v.value_at(t0);
            for ms in 1..=220 {
                let cur = v.value_at(t0 + Duration::from_millis(ms));
                if to > from {
                    assert!(cur >= prev, "{from}->{to} at {ms}ms");
                } else {
                    assert!(cur <= prev, "{from}->{to} at {ms}ms");
                }
                prev = cur;
            }
            assert_eq!(prev, to);
        }
    }

    #[test]
    fn retarget_mid_flight_starts_from_current_position() {
        let t0 = Instant::now();
        let mut v = AnimatedValue::new(0.0, t0, D);
        v.set_target(100.0, t0);
        let mid = t0 + Duration::from_millis(110);
        let shown = v.value_at(mid);
        v.set_target(20.0, mid);
        assert_eq!(v.current, shown);
        assert_eq!(v.value_at(mid), shown);
        assert_eq!(v.value_at(mid + D), 20.0);
    }

    #[test]
    fn clock_before_start_holds_origin() {
        let t0 = Instant::now() + Duration::from_secs(1);
        let mut v = AnimatedValue::new(3.0, t0, D);
        v.set_target(9.0, t0);
        assert_eq!(v.value_at(t0 - Duration::from_millis(50)), 3.0);
    }

    #[test]
    fn smoother_tracks_each_metric() {
        let t0 = Instant::now();
        let s = Smoother::new(D, t0);
        s.set_target(Metric::Cpu, 50.0, t0);
        let mid = s.value_at(Metric::Cpu, t0 + D / 2);
        assert!(mid > 25.0 && mid < 50.0, "{mid}");
        assert_eq!(s.value_at(Metric::Cpu, t0 + D), 50.0);
        assert_eq!(s.value_at(Metric::Ram, t0 + D), 0.0);
    }
}
