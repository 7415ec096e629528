//! Settings: load/save a small JSON file of collector and timing options.
//! Stored under XDG config dir: $XDG_CONFIG_HOME/sysmon/config.json
//! (fallback ~/.config/sysmon/config.json)

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::supervisor::{CollectorCommand, SupervisorTiming};

pub const COLLECTOR_ENV: &str = "SYSMON_COLLECTOR";

#[cfg(windows)]
const COLLECTOR_NAME: &str = "collector.exe";
#[cfg(not(windows))]
const COLLECTOR_NAME: &str = "collector";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector: Option<String>,
    /// 0 runs the collector in single-shot mode.
    pub interval_ms: u64,
    pub history_capacity: usize,
    pub animation_ms: u64,
    pub liveness_ms: u64,
    pub grace_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collector: None,
            interval_ms: 500,
            history_capacity: crate::history::DEFAULT_CAPACITY,
            animation_ms: crate::smoother::DEFAULT_DURATION.as_millis() as u64,
            liveness_ms: crate::supervisor::DEFAULT_LIVENESS.as_millis() as u64,
            grace_ms: crate::supervisor::DEFAULT_GRACE.as_millis() as u64,
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn animation(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }

    pub fn timing(&self) -> SupervisorTiming {
        SupervisorTiming {
            liveness: Duration::from_millis(self.liveness_ms.max(1)),
            grace: Duration::from_millis(self.grace_ms),
        }
    }

    /// Collector path: explicit setting, else discovered next to this binary.
    pub fn collector_path(&self) -> PathBuf {
        match self.collector.as_deref() {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => find_collector_executable(),
        }
    }

    pub fn collector_command(&self) -> CollectorCommand {
        CollectorCommand::streaming(self.collector_path(), self.interval())
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("sysmon")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sysmon")
    }
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn load_config() -> Config {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Config {
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

pub fn save_config(c: &Config) -> anyhow::Result<()> {
    save_config_to(&config_path(), c)
}

pub fn save_config_to(path: &Path, c: &Config) -> anyhow::Result<()> {
    use anyhow::Context;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(c)?;
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

/// Values given on the command line or in the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub collector: Option<String>,
    pub interval_ms: Option<u64>,
}

impl Overrides {
    /// CLI values, with the environment filling in a missing collector path.
    pub fn with_env(mut self) -> Self {
        if self.collector.is_none() {
            self.collector = std::env::var(COLLECTOR_ENV).ok().filter(|v| !v.is_empty());
        }
        self
    }

    pub fn apply(&self, base: &Config) -> Config {
        let mut c = base.clone();
        if let Some(p) = &self.collector {
            c.collector = Some(p.clone());
        }
        if let Some(ms) = self.interval_ms {
            c.interval_ms = ms;
        }
        c
    }
}

/// Look for the collector next to the running executable, including the
/// nested `_internal` directories bundled apps unpack into, then fall back to
/// PATH lookup.
pub fn find_collector_executable() -> PathBuf {
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        if let Some(found) = collector_candidates(&dir).into_iter().find(|p| p.exists()) {
            return found;
        }
    }
    PathBuf::from(COLLECTOR_NAME)
}

fn collector_candidates(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join(COLLECTOR_NAME),
        dir.join("_internal").join(COLLECTOR_NAME),
        dir.join("_internal").join("_internal").join(COLLECTOR_NAME),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let td = tempfile::tempdir().unwrap();
        let c = load_config_from(&td.path().join("nope.json"));
        assert_eq!(c, Config::default());
        assert_eq!(c.interval_ms, 500);
        assert_eq!(c.history_capacity, 120);
        assert_eq!(c.animation_ms, 220);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("config.json");
        fs::write(&path, r#"{"interval_ms": 250, "collector": "/opt/c"}"#).unwrap();
        let c = load_config_from(&path);
        assert_eq!(c.interval_ms, 250);
        assert_eq!(c.collector.as_deref(), Some("/opt/c"));
        assert_eq!(c.grace_ms, 800);
    }

    #[test]
    fn garbage_file_gives_defaults() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(load_config_from(&path), Config::default());
    }

    #[test]
    fn save_then_load() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("nested").join("config.json");
        let c = Config {
            collector: Some("/usr/local/bin/collector".into()),
            interval_ms: 0,
            ..Config::default()
        };
        save_config_to(&path, &c).unwrap();
        assert_eq!(load_config_from(&path), c);
    }

    #[test]
    fn overrides_win_over_file() {
        let base = Config {
            collector: Some("/from/file".into()),
            ..Config::default()
        };
        let o = Overrides {
            collector: Some("/from/cli".into()),
            interval_ms: Some(0),
        };
        let c = o.apply(&base);
        assert_eq!(c.collector.as_deref(), Some("/from/cli"));
        assert!(c.collector_command().args.is_empty());
        assert_eq!(Overrides::default().apply(&base), base);
    }

    #[test]
    fn candidates_cover_bundled_layouts() {
        let dir = Path::new("/app");
        let c = collector_candidates(dir);
        assert_eq!(c[0], dir.join(COLLECTOR_NAME));
        assert_eq!(c[2], dir.join("_internal/_internal").join(COLLECTOR_NAME));
    }
}
