//! End-to-end: headless mode prints one JSON line per collector record.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;

use assert_cmd::Command;

fn collector(dir: &std::path::Path, body: &str) -> String {
    let path = dir.join("collector");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

#[test]
fn headless_emits_normalized_snapshots() {
    let td = tempfile::tempdir().unwrap();
    let c = collector(
        td.path(),
        r#"printf '{"ok":true,"cpu_percent":"150","top_procs":[{"name":"init","ram_mb":3}]}\n'
printf 'not json\n'
printf '{"ok":false}\n'"#,
    );
    let out = Command::cargo_bin("sysmon")
        .unwrap()
        .env("XDG_CONFIG_HOME", td.path())
        .args(["--headless", "--once", "-c", &c])
        .timeout(std::time::Duration::from_secs(10))
        .output()
        .unwrap();
    assert!(out.status.success());

    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["ok"], true);
    assert_eq!(lines[0]["cpu_percent"], 100.0);
    assert_eq!(lines[0]["top_procs"][0]["name"], "init");
    assert!(lines[0]["top_procs"][0]["cpu_percent"].is_null());
    assert_eq!(lines[1]["ok"], false);
    assert_eq!(lines[1]["error"], "collector reported an error");
}

#[test]
fn headless_missing_collector_fails() {
    let td = tempfile::tempdir().unwrap();
    let out = Command::cargo_bin("sysmon")
        .unwrap()
        .env("XDG_CONFIG_HOME", td.path())
        .args(["--headless", "-c", "/nonexistent/collector"])
        .timeout(std::time::Duration::from_secs(10))
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("/nonexistent/collector"));
}
