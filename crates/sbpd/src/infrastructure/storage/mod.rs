//! Storage infrastructure: the TOML configuration file and the PID file.
//!
//! The `config` sub-module reads `/etc/sbpd/config.toml` (or the file named
//! with `--config`), falls back to defaults when it does not exist, and merges
//! it with the command-line overrides into the daemon's starting state.

pub mod config;
pub mod pid_file;
