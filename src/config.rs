//! Application-level configuration loading, including the team rosters fed to
//! the roster provider.

use std::collections::{HashMap, HashSet};
use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURTSIDE_BACK_CONFIG_PATH";

/// Regulation quarter length in seconds.
const DEFAULT_QUARTER_LENGTH_SECS: u16 = 600;
/// Clock ticks between persisted checkpoints.
const DEFAULT_CLOCK_CHECKPOINT_SECS: u32 = 5;
/// Broadcast channel capacity for the snapshot SSE stream.
const DEFAULT_SSE_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Seconds on a fresh quarter clock.
    pub quarter_length_secs: u16,
    /// Clock ticks between persisted clock checkpoints. The in-memory clock
    /// is authoritative between checkpoints.
    pub clock_checkpoint_secs: u32,
    /// Capacity of the snapshot broadcast channel.
    pub sse_capacity: usize,
    /// Eligible players per team, consumed by the roster provider.
    pub rosters: HashMap<Uuid, HashSet<Uuid>>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in
    /// defaults (and an empty roster set) when the file is absent or invalid.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        teams = config.rosters.len(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quarter_length_secs: DEFAULT_QUARTER_LENGTH_SECS,
            clock_checkpoint_secs: DEFAULT_CLOCK_CHECKPOINT_SECS,
            sse_capacity: DEFAULT_SSE_CAPACITY,
            rosters: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    #[serde(default)]
    quarter_length_secs: Option<u16>,
    #[serde(default)]
    clock_checkpoint_secs: Option<u32>,
    #[serde(default)]
    sse_capacity: Option<usize>,
    #[serde(default)]
    rosters: Vec<RawRoster>,
}

#[derive(Debug, Deserialize)]
/// JSON representation of one team roster entry.
struct RawRoster {
    team_id: Uuid,
    players: Vec<Uuid>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            quarter_length_secs: value
                .quarter_length_secs
                .unwrap_or(defaults.quarter_length_secs),
            clock_checkpoint_secs: value
                .clock_checkpoint_secs
                .unwrap_or(defaults.clock_checkpoint_secs),
            sse_capacity: value.sse_capacity.unwrap_or(defaults.sse_capacity),
            rosters: value
                .rosters
                .into_iter()
                .map(|roster| (roster.team_id, roster.players.into_iter().collect()))
                .collect(),
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
