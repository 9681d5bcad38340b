//! TOML configuration for the daemon.
//!
//! The file is optional.  Every field has a default, and anything given on the
//! command line wins over the file.  Example:
//!
//! ```toml
//! controls = ["b,17,VOL+,2", "b,27,PLAY", "e,23,24,VOLU"]
//!
//! [server]
//! host = "192.168.1.20"
//! port = 9000
//!
//! [player]
//! mac = "b8:27:eb:00:11:22"
//!
//! [daemon]
//! log_level = "info"
//! poll_interval_ms = 100
//! ```
//!
//! `controls` is a top-level key, so it has to appear before the first table
//! header.
//!
//! # Configured parameters
//!
//! [`resolve_initial_config`] records every server field that was supplied
//! (by either source) in a [`ConfigParameters`] mask.  Discovery never
//! overwrites a configured field.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sbpd_core::{ConfigParameters, ControlSpec, ControlSpecError, ServerEndpoint};
use serde::Deserialize;
use thiserror::Error;

/// Location of the configuration file when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sbpd/config.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A control specification is malformed.
    #[error("invalid control {spec:?}: {source}")]
    InvalidControl {
        spec: String,
        #[source]
        source: ControlSpecError,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Control specifications, `b,<pin>,<CMD>[,<edge>]` or
    /// `e,<pin_a>,<pin_b>[,<CMD>][,<edge>]`.
    #[serde(default)]
    pub controls: Vec<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub daemon: DaemonSettings,
}

/// Media server connection.  Absent fields are discovered.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Player identity.  The MAC is looked up on the host when absent.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    pub mac: Option<String>,
}

/// Daemon behaviour settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DaemonSettings {
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Main loop period.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Minimum time between two scans of the kernel TCP table.
    #[serde(default = "default_host_search_interval_secs")]
    pub host_search_interval_secs: u64,
    /// Upper bound for one JSON-RPC exchange, connect included.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Clear a button's pending flag once its command was sent.
    #[serde(default)]
    pub clear_button_after_dispatch: bool,
    /// Treat transport failures and non-2xx replies as failed dispatches.
    #[serde(default)]
    pub report_transport_failures: bool,
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_host_search_interval_secs() -> u64 {
    3
}
fn default_request_timeout_ms() -> u64 {
    2000
}
fn default_pid_file() -> PathBuf {
    PathBuf::from("/var/run/sbpd.pid")
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval_ms: default_poll_interval_ms(),
            host_search_interval_secs: default_host_search_interval_secs(),
            request_timeout_ms: default_request_timeout_ms(),
            clear_button_after_dispatch: false,
            report_transport_failures: false,
            pid_file: default_pid_file(),
        }
    }
}

impl DaemonSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Number of poll iterations between two host searches (at least 1).
    ///
    /// With the defaults this is 3 s / 100 ms = 30.
    pub fn host_search_ticks(&self) -> u32 {
        let interval_ms = self.host_search_interval_secs.saturating_mul(1000);
        let ticks = interval_ms / self.poll_interval_ms.max(1);
        u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads the configuration file at `path`, returning the defaults if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<DaemonConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DaemonConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Merging ───────────────────────────────────────────────────────────────────

/// Values given on the command line.  `None` / empty means "not given".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub mac: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Replaces the file's `controls` when non-empty.
    pub controls: Vec<String>,
    pub pid_file: Option<PathBuf>,
}

/// Starting state of the daemon after merging file and command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Server fields known before discovery runs.
    pub endpoint: ServerEndpoint,
    /// Which endpoint fields (and the MAC) were supplied by the user.
    pub configured: ConfigParameters,
    /// Player MAC if supplied; otherwise looked up at startup.
    pub mac: Option<String>,
    pub controls: Vec<ControlSpec>,
    pub settings: DaemonSettings,
}

/// Merges the configuration file with the command-line overrides.
///
/// Empty strings count as "not given".
///
/// # Errors
///
/// Returns [`ConfigError::InvalidControl`] for the first control
/// specification that does not parse.
pub fn resolve_initial_config(
    file: DaemonConfig,
    overrides: ConfigOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let mut configured = ConfigParameters::empty();
    let mut pick = |cli: Option<String>, file: Option<String>, flag: u16| {
        let value = non_empty(cli).or_else(|| non_empty(file));
        if value.is_some() {
            configured.insert(flag);
        }
        value
    };

    let host = pick(overrides.host, file.server.host, ConfigParameters::HOST);
    let user = pick(overrides.user, file.server.user, ConfigParameters::USER);
    let password = pick(
        overrides.password,
        file.server.password,
        ConfigParameters::PASSWORD,
    );
    let mac = pick(overrides.mac, file.player.mac, ConfigParameters::MAC);

    let port = non_zero(overrides.port).or(non_zero(file.server.port));
    if port.is_some() {
        configured.insert(ConfigParameters::PORT);
    }

    let control_strings = if overrides.controls.is_empty() {
        file.controls
    } else {
        overrides.controls
    };
    let controls = control_strings
        .iter()
        .map(|spec| {
            spec.parse::<ControlSpec>()
                .map_err(|source| ConfigError::InvalidControl {
                    spec: spec.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut settings = file.daemon;
    if let Some(pid_file) = overrides.pid_file {
        settings.pid_file = pid_file;
    }

    Ok(ResolvedConfig {
        endpoint: ServerEndpoint {
            host,
            port,
            user,
            password,
        },
        configured,
        mac,
        controls,
        settings,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_zero(port: Option<u16>) -> Option<u16> {
    port.filter(|p| *p != 0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
