//! Entry point for sysmon. Parses args, resolves config, then runs the
//! dashboard or the headless JSON stream.

use std::env;
use std::sync::Arc;

use anyhow::bail;
use tracing::{info, warn};

use sysmon::app::App;
use sysmon::config::{config_dir, config_path, load_config, save_config, Config, Overrides};
use sysmon::logging;
use sysmon::supervisor::{CollectorSupervisor, StopReason, SupervisorState};
use sysmon::telemetry::{Telemetry, TelemetryObserver};
use sysmon::types::Snapshot;

#[derive(Debug, Default)]
struct ParsedArgs {
    collector: Option<String>,
    interval_ms: Option<u64>,
    once: bool,
    headless: bool,
    save: bool,
    dry_run: bool,
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--collector PATH|-c PATH] [--interval MS|-i MS] [--once] [--headless] [--save] [--dry-run]"
    )
}

fn parse_interval(prog: &str, v: Option<String>) -> Result<u64, String> {
    match v.as_deref().map(str::parse::<u64>) {
        Some(Ok(ms)) => Ok(ms),
        _ => Err(format!("--interval expects milliseconds. {}", usage(prog))),
    }
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "sysmon".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--collector" | "-c" => match it.next() {
                Some(v) if !v.is_empty() => parsed.collector = Some(v),
                _ => return Err(format!("--collector expects a path. {}", usage(&prog))),
            },
            "--interval" | "-i" => {
                parsed.interval_ms = Some(parse_interval(&prog, it.next())?);
            }
            "--once" => parsed.once = true,
            "--headless" => parsed.headless = true,
            "--save" => parsed.save = true,
            "--dry-run" => parsed.dry_run = true,
            _ if arg.starts_with("--collector=") => match arg.split_once('=') {
                Some((_, v)) if !v.is_empty() => parsed.collector = Some(v.to_string()),
                _ => return Err(format!("--collector expects a path. {}", usage(&prog))),
            },
            _ if arg.starts_with("--interval=") => {
                let v = arg.split_once('=').map(|(_, v)| v.to_string());
                parsed.interval_ms = Some(parse_interval(&prog, v)?);
            }
            _ => {
                return Err(format!("Unexpected argument '{arg}'. {}", usage(&prog)));
            }
        }
    }
    Ok(parsed)
}

/// Headless sink: one JSON line per Snapshot on stdout.
struct JsonLines;

impl TelemetryObserver for JsonLines {
    fn on_snapshot(&self, snapshot: &Snapshot) {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("encoding snapshot failed: {e}"),
        }
    }

    fn on_status(&self, state: &SupervisorState) {
        info!(status = %state, "status");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let file_config = load_config();
    let cli = Overrides {
        collector: parsed.collector.clone(),
        interval_ms: if parsed.once { Some(0) } else { parsed.interval_ms },
    };
    if parsed.save {
        // Only what was typed on the command line is persisted.
        let to_save = cli.apply(&file_config);
        save_config(&to_save)?;
        eprintln!("Saved {}", config_path().display());
    }
    let config = cli.with_env().apply(&file_config);

    if parsed.dry_run {
        println!("{}", config.collector_command());
        return Ok(());
    }

    if parsed.headless {
        logging::init_stderr();
        return run_headless(&config).await;
    }

    let log_path = config_dir().join("sysmon.log");
    if let Err(e) = logging::init_file(&log_path) {
        eprintln!("logging disabled: {e:#}");
    }
    let telemetry = Arc::new(Telemetry::new(config.history_capacity, config.animation()));
    let supervisor = CollectorSupervisor::start(
        config.collector_command(),
        telemetry.clone(),
        config.timing(),
    );
    let mut app = App::new(telemetry, supervisor.subscribe(), config.interval());
    app.run(&supervisor).await
}

async fn run_headless(config: &Config) -> anyhow::Result<()> {
    let telemetry = Arc::new(Telemetry::new(config.history_capacity, config.animation()));
    telemetry.register(Arc::new(JsonLines));
    let supervisor = CollectorSupervisor::start(
        config.collector_command(),
        telemetry.clone(),
        config.timing(),
    );

    let state = tokio::select! {
        state = supervisor.wait_stopped() => state,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            supervisor.shutdown().await
        }
    };

    let stats = telemetry.stats();
    info!(
        frames_ok = stats.frames_ok,
        frames_malformed = stats.frames_malformed,
        collector_failures = stats.collector_failures,
        status = %state,
        "collector finished"
    );
    if let SupervisorState::Stopped(StopReason::SpawnFailed(msg)) = state {
        bail!("{msg}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Result<ParsedArgs, String> {
        parse_args(std::iter::once("sysmon").chain(v.iter().copied()).map(String::from))
    }

    #[test]
    fn long_short_and_equals_forms() {
        let p = args(&["-c", "/opt/collector", "--interval", "250", "--headless"]).unwrap();
        assert_eq!(p.collector.as_deref(), Some("/opt/collector"));
        assert_eq!(p.interval_ms, Some(250));
        assert!(p.headless && !p.once && !p.save);

        let p = args(&["--collector=/x", "--interval=0", "--once", "--save", "--dry-run"]).unwrap();
        assert_eq!(p.collector.as_deref(), Some("/x"));
        assert_eq!(p.interval_ms, Some(0));
        assert!(p.once && p.save && p.dry_run);
    }

    #[test]
    fn help_and_bad_input_are_errors() {
        assert!(args(&["--help"]).unwrap_err().starts_with("Usage: sysmon"));
        assert!(args(&["-i", "fast"]).is_err());
        assert!(args(&["--interval"]).is_err());
        assert!(args(&["-c"]).unwrap_err().contains("--collector expects a path"));
        assert!(args(&["--collector", ""]).is_err());
        assert!(args(&["--collector="]).is_err());
        assert!(args(&["stray"]).unwrap_err().contains("stray"));
    }
}
