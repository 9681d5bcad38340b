//! Kernel TCP connection table as a [`ConnectionTable`].

use std::net::Ipv4Addr;
use std::path::PathBuf;

use sbpd_core::find_server_address;
use tracing::trace;

use crate::application::discovery::{ConnectionTable, DiscoveryError};

/// The IPv4 TCP socket table.
pub const PROC_NET_TCP: &str = "/proc/net/tcp";

/// Reads the connection table from procfs on every search.
#[derive(Debug, Clone)]
pub struct ProcTcpTable {
    path: PathBuf,
}

impl ProcTcpTable {
    pub fn new() -> Self {
        Self::with_path(PROC_NET_TCP)
    }

    /// Reads the table from `path` instead, e.g. a captured copy.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcTcpTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTable for ProcTcpTable {
    fn server_address(&mut self) -> Result<Option<Ipv4Addr>, DiscoveryError> {
        let contents =
            std::fs::read_to_string(&self.path).map_err(DiscoveryError::TableUnavailable)?;
        trace!(path = %self.path.display(), bytes = contents.len(), "connection table read");
        Ok(find_server_address(&contents)?)
    }
}
