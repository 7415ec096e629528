//! Record validation: one [`RawFrame`] in, one normalized [`Snapshot`] out.
//!
//! Only a frame that is not a JSON object at all is an error. Inside an
//! `ok:true` record a missing or non-numeric field becomes 0 and a bad
//! `top_procs` entry is skipped, so one collector hiccup never blanks the
//! whole dashboard.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::framing::RawFrame;
use crate::types::{clamp_percent, ProcessEntry, Snapshot, GENERIC_COLLECTOR_ERROR};

/// Longest slice of an offending frame that may appear in messages.
pub const EXCERPT_LEN: usize = 80;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed frame ({reason}): {}", excerpt(.raw))]
    Malformed {
        reason: String,
        /// Full offending text, for diagnostics only.
        raw: String,
    },
}

impl ParseError {
    pub fn raw(&self) -> &str {
        match self {
            ParseError::Malformed { raw, .. } => raw,
        }
    }
}

/// First [`EXCERPT_LEN`] characters of `raw`, marked when cut.
pub fn excerpt(raw: &str) -> String {
    let mut chars = raw.chars();
    let head: String = chars.by_ref().take(EXCERPT_LEN).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

pub fn parse(frame: &RawFrame) -> Result<Snapshot, ParseError> {
    let text = String::from_utf8_lossy(frame.as_bytes());
    let value: Value = serde_json::from_str(&text).map_err(|e| ParseError::Malformed {
        reason: e.to_string(),
        raw: text.to_string(),
    })?;
    let Value::Object(obj) = value else {
        return Err(ParseError::Malformed {
            reason: "expected a JSON object".into(),
            raw: text.into_owned(),
        });
    };

    if !truthy(obj.get("ok")) {
        return Ok(Snapshot::failed(error_text(obj.get("error"))));
    }

    Ok(Snapshot {
        ok: true,
        error: None,
        cpu_percent: percent(&obj, "cpu_percent"),
        mem_total_mb: count(&obj, "mem_total_mb"),
        mem_used_mb: count(&obj, "mem_used_mb"),
        mem_free_mb: count(&obj, "mem_free_mb"),
        mem_used_percent: percent(&obj, "mem_used_percent"),
        disk_total_gb: amount(&obj, "disk_total_gb"),
        disk_used_gb: amount(&obj, "disk_used_gb"),
        disk_free_gb: amount(&obj, "disk_free_gb"),
        disk_active_percent: percent(&obj, "disk_active_percent"),
        net_down_kbps: amount(&obj, "net_down_kbps"),
        net_up_kbps: amount(&obj, "net_up_kbps"),
        top_procs: processes(obj.get("top_procs")),
    })
}

// Loose truthiness: zero, empty and null are false, everything else true.
fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|x| x != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn error_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => GENERIC_COLLECTOR_ERROR.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Lenient numeric read: numbers and numeric strings, anything else is None.
fn number(v: Option<&Value>) -> Option<f64> {
    let x = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    x.is_finite().then_some(x)
}

fn percent(obj: &Map<String, Value>, key: &str) -> f64 {
    clamp_percent(number(obj.get(key)).unwrap_or(0.0))
}

fn amount(obj: &Map<String, Value>, key: &str) -> f64 {
    number(obj.get(key)).unwrap_or(0.0).max(0.0)
}

fn count(obj: &Map<String, Value>, key: &str) -> u64 {
    let v = obj.get(key);
    if let Some(exact) = v.and_then(Value::as_u64) {
        return exact;
    }
    number(v).map_or(0, |x| x.max(0.0).round() as u64)
}

fn processes(v: Option<&Value>) -> Vec<ProcessEntry> {
    let Some(Value::Array(items)) = v else {
        return Vec::new();
    };
    items.iter().filter_map(process_entry).collect()
}

fn process_entry(v: &Value) -> Option<ProcessEntry> {
    let obj = v.as_object()?;
    let name = obj.get("name")?.as_str()?.to_string();
    Some(ProcessEntry {
        name,
        ram_mb: number(obj.get("ram_mb")).unwrap_or(0.0).max(0.0),
        cpu_percent: number(obj.get("cpu_percent")).map(clamp_percent),
    })
}
