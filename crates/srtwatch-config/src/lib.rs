//! Shared configuration for the srtwatch CLI and server.
//!
//! Layered loading (built-in defaults → TOML file → `SRTWATCH_` env),
//! platform config/data paths, and translation into the runtime config
//! structs the core and server crates consume.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use srtwatch_core::WatchdogConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by every subcommand.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub observer: ObserverSection,
}

/// `[server]` — the `srtwatch serve` side.
#[derive(Debug, Deserialize, Serialize)]
pub struct ServerSection {
    /// Bind address, e.g. "0.0.0.0:5000".
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Maximum records per snapshot response.
    #[serde(default = "default_snapshot_limit")]
    pub snapshot_limit: usize,

    /// Push-channel heartbeat interval in seconds.
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,

    /// Seconds a device may go silent before the watchdog demotes it.
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_secs: u64,

    /// Watchdog sweep interval in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            snapshot_limit: default_snapshot_limit(),
            heartbeat_secs: default_heartbeat(),
            liveness_timeout_secs: default_liveness_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".into()
}
fn default_snapshot_limit() -> usize {
    200
}
fn default_heartbeat() -> u64 {
    5
}
fn default_liveness_timeout() -> u64 {
    60
}
fn default_sweep_interval() -> u64 {
    30
}

impl ServerSection {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|_| ConfigError::Validation {
            field: "server.bind".into(),
            reason: format!("not a socket address: {}", self.bind),
        })
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn watchdog(&self) -> WatchdogConfig {
        WatchdogConfig {
            liveness_timeout: Duration::from_secs(self.liveness_timeout_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}

/// `[observer]` — the `srtwatch watch` side.
#[derive(Debug, Deserialize, Serialize)]
pub struct ObserverSection {
    /// Monitor server base URL.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Alert webhook URL. Alerts are disabled when unset.
    pub webhook_url: Option<String>,

    /// Prefix tag for alert lines, e.g. a studio or fleet name.
    #[serde(default)]
    pub prefix: String,

    /// Fallback poll interval in seconds while the push channel is down.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Reconnect backoff increment in seconds.
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,

    /// Reconnect backoff cap in seconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,

    /// Override for the persisted watchlist location.
    pub watchlist_path: Option<PathBuf>,
}

impl Default for ObserverSection {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            webhook_url: None,
            prefix: String::new(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            base_delay_secs: default_base_delay(),
            max_delay_secs: default_max_delay(),
            watchlist_path: None,
        }
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000/".into()
}
fn default_poll_interval() -> u64 {
    10
}
fn default_timeout() -> u64 {
    10
}
fn default_base_delay() -> u64 {
    1
}
fn default_max_delay() -> u64 {
    30
}

impl ObserverSection {
    pub fn server_url(&self) -> Result<url::Url, ConfigError> {
        self.server_url
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "observer.server_url".into(),
                reason: format!("invalid URL: {}", self.server_url),
            })
    }

    pub fn webhook_url(&self) -> Result<Option<url::Url>, ConfigError> {
        self.webhook_url
            .as_deref()
            .map(|raw| {
                raw.parse().map_err(|_| ConfigError::Validation {
                    field: "observer.webhook_url".into(),
                    reason: format!("invalid URL: {raw}"),
                })
            })
            .transpose()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Resolved watchlist location: explicit override or platform data dir.
    pub fn watchlist_path(&self) -> PathBuf {
        self.watchlist_path
            .clone()
            .unwrap_or_else(default_watchlist_path)
    }
}

// ── Platform paths ──────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "srtwatch", "srtwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the persisted watchlist.
pub fn default_watchlist_path() -> PathBuf {
    ProjectDirs::from("com", "srtwatch", "srtwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("watchlist.json");
            p
        },
        |dirs| dirs.data_dir().join("watchlist.json"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("srtwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from a specific file + environment.
///
/// Env keys use a double underscore between the section and the field,
/// since the field names themselves contain underscores:
/// `SRTWATCH_OBSERVER__WEBHOOK_URL`, `SRTWATCH_SERVER__SNAPSHOT_LIMIT`.
/// `SRTWATCH_SERVER`, `SRTWATCH_CONFIG`, `SRTWATCH_OUTPUT` and
/// `SRTWATCH_WEBHOOK` are CLI flag variables, not config keys, and are
/// excluded from the env layer.
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("SRTWATCH_")
                .ignore(&["server", "config", "output", "webhook"])
                .split("__"),
        );

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load the full Config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config, returning defaults if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────
