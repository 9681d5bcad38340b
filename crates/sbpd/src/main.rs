//! SqueezeButtonPi daemon entry point.
//!
//! Wires the configuration, the GPIO backend, discovery and the JSON-RPC
//! transport together and runs the poll loop until SIGINT or SIGTERM.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load + resolve config     -- file, then command-line overrides
//!  └─ find MAC                  -- --mac / file / UTMAC / /sys/class/net
//!  └─ ControlMapper             -- registers buttons and encoders (rppal)
//!  └─ poll loop (100 ms)
//!       ├─ Discovery::poll      -- /proc/net/tcp + UDP 3483
//!       ├─ poll_buttons         -- pending presses → JSON-RPC
//!       └─ poll_encoders        -- accumulated movement → volume change
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use sbpd_core::{ConfigParameters, PinBackend};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sbpd::application::control::{ControlMapper, ControlOptions};
use sbpd::application::discovery::Discovery;
use sbpd::infrastructure::network::discovery::UdpDiscoveryChannel;
use sbpd::infrastructure::network::identity::find_mac;
use sbpd::infrastructure::network::tcp_table::ProcTcpTable;
use sbpd::infrastructure::storage::config::{
    load_config, resolve_initial_config, ConfigOverrides, ResolvedConfig, DEFAULT_CONFIG_PATH,
};
use sbpd::infrastructure::storage::pid_file::PidFile;
use sbpd::infrastructure::transport::jsonrpc::{JsonRpcClient, TransportOptions};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// SqueezeButtonPi: GPIO buttons and rotary encoders as remote controls for
/// the local Squeezebox player.
///
/// Controls are given as `b,<pin>,<CMD>[,<edge>]` for buttons
/// (CMD is PLAY, VOL+, VOL-, PREV, NEXT or POWR) and
/// `e,<pin_a>,<pin_b>,<CMD>[,<edge>]` for encoders (CMD is VOLU).
/// Edge is 1 (falling), 2 (rising) or 3 (both, the default).
#[derive(Debug, Parser)]
#[command(name = "sbpd", version)]
struct Cli {
    /// Player MAC address (xx:xx:xx:xx:xx:xx).
    #[arg(short = 'M', long, env = "SBPD_MAC")]
    mac: Option<String>,

    /// Server address.  Discovered from the player's connection when unset.
    #[arg(short = 'A', long, env = "SBPD_ADDRESS")]
    address: Option<String>,

    /// Server JSON-RPC port.  Asked from the server when unset.
    #[arg(short = 'P', long, env = "SBPD_PORT")]
    port: Option<u16>,

    /// Server user name.
    #[arg(short = 'u', long, env = "SBPD_USERNAME")]
    username: Option<String>,

    /// Server password.
    #[arg(short = 'p', long, env = "SBPD_PASSWORD")]
    password: Option<String>,

    /// Log debug output.
    #[arg(short, long, conflicts_with = "silent")]
    verbose: bool,

    /// Log errors only.
    #[arg(short, long)]
    silent: bool,

    /// Configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, env = "SBPD_CONFIG")]
    config: PathBuf,

    /// PID file location.
    #[arg(long, env = "SBPD_PID_FILE")]
    pid_file: Option<PathBuf>,

    /// Control specifications.  Replace the file's `controls` when given.
    controls: Vec<String>,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is not set.
    fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        if self.verbose {
            "debug"
        } else if self.silent {
            "error"
        } else if configured.trim().is_empty() {
            "info"
        } else {
            configured
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            mac: self.mac.clone(),
            host: self.address.clone(),
            port: self.port,
            user: self.username.clone(),
            password: self.password.clone(),
            controls: self.controls.clone(),
            pid_file: self.pid_file.clone(),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level(&file.daemon.log_level))),
        )
        .with_writer(std::io::stderr)
        .init();

    let resolved =
        resolve_initial_config(file, cli.overrides()).context("invalid configuration")?;

    info!("SqueezeButtonPi starting");

    let _pid_file = match PidFile::create(&resolved.settings.pid_file) {
        Ok(pid_file) => Some(pid_file),
        Err(e) => {
            warn!(
                path = %resolved.settings.pid_file.display(),
                error = %e,
                "failed to write PID file"
            );
            None
        }
    };

    let backend = open_gpio()?;
    run(backend, resolved).await
}

#[cfg(target_os = "linux")]
fn open_gpio() -> anyhow::Result<sbpd::infrastructure::gpio::raspberry_pi::RppalPinBackend> {
    sbpd::infrastructure::gpio::raspberry_pi::RppalPinBackend::new()
        .context("failed to open the GPIO peripheral")
}

#[cfg(not(target_os = "linux"))]
fn open_gpio() -> anyhow::Result<sbpd_core::gpio::mock::MockPinBackend> {
    anyhow::bail!("GPIO access is only supported on Linux")
}

async fn run<B: PinBackend>(backend: B, resolved: ResolvedConfig) -> anyhow::Result<()> {
    let ResolvedConfig {
        mut endpoint,
        configured,
        mac,
        controls,
        settings,
    } = resolved;

    let mut discovered_flags = 0;
    let mac = match mac {
        Some(mac) => mac,
        None => {
            let mac = find_mac().context("no MAC address for the player")?;
            discovered_flags |= ConfigParameters::MAC;
            mac
        }
    };

    let client = JsonRpcClient::new(
        mac,
        TransportOptions {
            timeout: settings.request_timeout(),
            report_failures: settings.report_transport_failures,
        },
    );
    let mut mapper = ControlMapper::new(
        backend,
        Arc::new(client),
        ControlOptions {
            clear_button_after_dispatch: settings.clear_button_after_dispatch,
        },
    );
    for spec in &controls {
        match mapper.configure(spec) {
            Ok(()) => info!(control = %spec, "control configured"),
            Err(e) => error!(control = %spec, error = %e, "control skipped"),
        }
    }

    let mut discovery = Discovery::new(
        ProcTcpTable::new(),
        UdpDiscoveryChannel::new(),
        configured,
        settings.host_search_ticks(),
    );
    if discovered_flags != 0 {
        discovery.mark_discovered(discovered_flags);
    }

    // ── SIGINT / SIGTERM handler ──────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("shutdown signal received");
        running_clone.store(false, Ordering::Relaxed);
    });

    info!(
        buttons = mapper.registry().button_count(),
        encoders = mapper.registry().encoder_count(),
        "SqueezeButtonPi ready"
    );

    let poll_interval = settings.poll_interval();
    while running.load(Ordering::Relaxed) {
        discovery.poll(&mut endpoint);
        mapper.poll_buttons(&endpoint).await;
        mapper.poll_encoders(&endpoint).await;
        tokio::time::sleep(poll_interval).await;
    }

    info!("SqueezeButtonPi stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_maps_flags_to_overrides() {
        // Arrange
        let cli = Cli::parse_from([
            "sbpd", "-M", "b8:27:eb:00:11:22", "-A", "192.168.1.20", "-P", "9000", "-u",
            "admin", "-p", "secret", "b,17,VOL+,2", "e,23,24,VOLU",
        ]);

        // Act
        let overrides = cli.overrides();

        // Assert
        assert_eq!(overrides.mac.as_deref(), Some("b8:27:eb:00:11:22"));
        assert_eq!(overrides.host.as_deref(), Some("192.168.1.20"));
        assert_eq!(overrides.port, Some(9000));
        assert_eq!(overrides.user.as_deref(), Some("admin"));
        assert_eq!(overrides.password.as_deref(), Some("secret"));
        assert_eq!(overrides.controls, vec!["b,17,VOL+,2", "e,23,24,VOLU"]);
    }

    #[test]
    fn test_log_level_precedence() {
        let verbose = Cli::parse_from(["sbpd", "-v"]);
        let silent = Cli::parse_from(["sbpd", "-s"]);
        let plain = Cli::parse_from(["sbpd"]);

        assert_eq!(verbose.log_level("warn"), "debug");
        assert_eq!(silent.log_level("warn"), "error");
        assert_eq!(plain.log_level("warn"), "warn");
        assert_eq!(plain.log_level(""), "info");
    }

    #[test]
    fn test_verbose_and_silent_conflict() {
        assert!(Cli::try_parse_from(["sbpd", "-v", "-s"]).is_err());
    }
}
