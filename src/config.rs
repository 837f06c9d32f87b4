//! Application-level configuration loading: process role, clock ownership, blind schedule.

use std::{env, fs, io::ErrorKind, path::PathBuf, str::FromStr, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{
    blinds::{BlindLevel, BlindSchedule, LevelKind},
    clock::DEFAULT_SYNC_INTERVAL,
    undo::UNDO_WINDOW,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LIVE_TOURNAMENT_CONFIG_PATH";
/// Environment variable that overrides the configured role.
const ROLE_ENV: &str = "LIVE_TOURNAMENT_ROLE";

/// Which screen of the venue this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessRole {
    /// Operator console issuing commands.
    Operator,
    /// Big-screen countdown.
    Display,
    /// Public read-only viewer.
    Viewer,
}

impl FromStr for ProcessRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "operator" | "control" => Ok(ProcessRole::Operator),
            "display" | "timer" => Ok(ProcessRole::Display),
            "viewer" | "web" => Ok(ProcessRole::Viewer),
            other => Err(format!("unknown process role `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    role: ProcessRole,
    clock_authority: bool,
    schedule: BlindSchedule,
    sync_interval: Duration,
    undo_window: Duration,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults, then apply env overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                RawConfig::default()
            }
        };

        let role = match env::var(ROLE_ENV) {
            Ok(value) => match value.parse() {
                Ok(role) => Some(role),
                Err(err) => {
                    warn!(error = %err, "ignoring {ROLE_ENV}");
                    raw.role
                }
            },
            Err(_) => raw.role,
        };

        let config = raw.resolve(role.unwrap_or(ProcessRole::Display));
        info!(
            role = ?config.role,
            clock_authority = config.clock_authority,
            levels = config.schedule.len(),
            "configuration ready"
        );
        config
    }

    /// Defaults for the given role: the display owns the clock.
    pub fn for_role(role: ProcessRole) -> Self {
        RawConfig::default().resolve(role)
    }

    /// Override clock ownership.
    pub fn with_clock_authority(mut self, authority: bool) -> Self {
        self.clock_authority = authority;
        self
    }

    /// Override the blind schedule.
    pub fn with_schedule(mut self, schedule: BlindSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Role of this process.
    pub fn role(&self) -> ProcessRole {
        self.role
    }

    /// Whether this process persists clock syncs, auto-advances and pause snapshots.
    pub fn clock_authority(&self) -> bool {
        self.clock_authority
    }

    /// Blind schedule shared by every process of the venue.
    pub fn schedule(&self) -> &BlindSchedule {
        &self.schedule
    }

    /// Period between two clock pushes.
    pub fn sync_interval(&self) -> Duration {
        self.sync_interval
    }

    /// How long an operator action stays reversible.
    pub fn undo_window(&self) -> Duration {
        self.undo_window
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_role(ProcessRole::Display)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    role: Option<ProcessRole>,
    clock_authority: Option<bool>,
    sync_interval_secs: Option<u64>,
    undo_window_secs: Option<u64>,
    levels: Option<Vec<RawLevel>>,
}

impl RawConfig {
    fn resolve(self, role: ProcessRole) -> AppConfig {
        let schedule = match self.levels {
            Some(levels) => BlindSchedule::new(levels.into_iter().map(Into::into).collect())
                .unwrap_or_else(|| {
                    warn!("configured blind schedule is empty; using the default structure");
                    BlindSchedule::default()
                }),
            None => BlindSchedule::default(),
        };

        AppConfig {
            role,
            clock_authority: self
                .clock_authority
                .unwrap_or(role == ProcessRole::Display),
            schedule,
            sync_interval: self
                .sync_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SYNC_INTERVAL),
            undo_window: self
                .undo_window_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(UNDO_WINDOW),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of one schedule entry; breaks omit the blinds.
struct RawLevel {
    #[serde(default)]
    is_break: bool,
    sb: Option<u32>,
    bb: Option<u32>,
    ante: Option<u32>,
    duration_sec: u32,
}

impl From<RawLevel> for BlindLevel {
    fn from(value: RawLevel) -> Self {
        if value.is_break {
            return BlindLevel {
                index: 0,
                kind: LevelKind::Break,
                sb: None,
                bb: None,
                ante: None,
                duration_sec: value.duration_sec,
            };
        }

        BlindLevel {
            index: 0,
            kind: LevelKind::Level,
            sb: value.sb,
            bb: value.bb,
            ante: value.ante.or(Some(0)),
            duration_sec: value.duration_sec,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_owns_the_clock_by_default() {
        assert!(AppConfig::for_role(ProcessRole::Display).clock_authority());
        assert!(!AppConfig::for_role(ProcessRole::Operator).clock_authority());
        assert!(!AppConfig::for_role(ProcessRole::Viewer).clock_authority());
    }

    #[test]
    fn file_overrides_schedule_and_intervals() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "role": "operator",
                "clock_authority": true,
                "sync_interval_secs": 5,
                "levels": [
                    { "sb": 1, "bb": 2, "duration_sec": 60 },
                    { "is_break": true, "duration_sec": 30 }
                ]
            }"#,
        )
        .unwrap();
        let config = raw.resolve(ProcessRole::Operator);

        assert!(config.clock_authority());
        assert_eq!(config.sync_interval(), Duration::from_secs(5));
        assert_eq!(config.undo_window(), UNDO_WINDOW);
        assert_eq!(config.schedule().len(), 2);
        assert!(config.schedule().level(1).unwrap().is_break());
        assert_eq!(config.schedule().level(0).unwrap().label(), "1/2");
    }

    #[test]
    fn roles_parse_from_env_values() {
        assert_eq!("Timer".parse::<ProcessRole>(), Ok(ProcessRole::Display));
        assert_eq!("operator".parse::<ProcessRole>(), Ok(ProcessRole::Operator));
        assert!("kiosk".parse::<ProcessRole>().is_err());
    }
}
