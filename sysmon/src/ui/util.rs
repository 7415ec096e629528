//! Small UI helpers: rates, optional percentages, truncation.

/// kbps below 1000, Mbps from there up.
pub fn fmt_speed(kbps: f64) -> String {
    if kbps >= 1000.0 {
        format!("{:.2} Mbps", kbps / 1000.0)
    } else {
        format!("{kbps:.1} kbps")
    }
}

/// Unknown CPU usage shows as a dash, not as zero.
pub fn fmt_cpu(v: Option<f64>) -> String {
    match v {
        Some(p) => format!("{p:>5.1}"),
        None => "—".into(),
    }
}

pub fn truncate_middle(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 3 {
        return "...".into();
    }
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = s.chars().take(left).collect();
    let tail: String = s.chars().skip(len - right).collect();
    format!("{head}...{tail}")
}
