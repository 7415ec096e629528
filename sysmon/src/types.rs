//! Types that mirror the collector's JSON schema, after normalization.

use serde::Serialize;

/// Fallback text for an `ok:false` record that carries no usable `error`.
pub const GENERIC_COLLECTOR_ERROR: &str = "collector reported an error";

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProcessEntry {
    pub name: String,
    pub ram_mb: f64,
    // None = collector could not tell, which is not the same as 0%
    pub cpu_percent: Option<f64>,
}

/// One validated instant of telemetry.
///
/// Every field is always populated: failed records carry zeros and an empty
/// process list, never missing data.
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cpu_percent: f64,
    pub mem_total_mb: u64,
    pub mem_used_mb: u64,
    pub mem_free_mb: u64,
    pub mem_used_percent: f64,
    pub disk_total_gb: f64,
    pub disk_used_gb: f64,
    pub disk_free_gb: f64,
    pub disk_active_percent: f64,
    pub net_down_kbps: f64,
    pub net_up_kbps: f64,
    pub top_procs: Vec<ProcessEntry>,
}

impl Snapshot {
    /// A record for an instant the collector could not sample.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Value of a tracked metric, as fed into history and the gauges.
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cpu => self.cpu_percent,
            Metric::Ram => self.mem_used_percent,
            Metric::DiskActive => self.disk_active_percent,
        }
    }
}

/// Scalar percentages that get a rolling history and a smoothed gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Cpu,
    Ram,
    DiskActive,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Cpu, Metric::Ram, Metric::DiskActive];

    pub const fn index(self) -> usize {
        match self {
            Metric::Cpu => 0,
            Metric::Ram => 1,
            Metric::DiskActive => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Ram => "RAM",
            Metric::DiskActive => "Disk Active",
        }
    }
}

/// Clamp a percentage into [0, 100]; non-finite input maps to 0.
pub fn clamp_percent(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
