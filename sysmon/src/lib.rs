//! sysmon: live host telemetry from a streaming collector process.
//!
//! The collector writes one JSON object per line on stdout. The supervisor
//! frames and validates those lines and feeds [`telemetry::Telemetry`], which
//! keeps rolling history and eased gauge values for whatever draws them.

pub mod app;
pub mod config;
pub mod error;
pub mod framing;
pub mod history;
pub mod logging;
pub mod smoother;
pub mod supervisor;
pub mod telemetry;
pub mod types;
pub mod ui;
pub mod validate;
