//! Discovery: finds the media server's address and JSON-RPC control port.
//!
//! Runs as a small state machine driven by [`Discovery::poll`] from the main
//! loop:
//!
//! ```text
//!  SearchingHost ──address found──▶ SearchingPort ──reply──▶ Resolved
//!        ▲                                                      │
//!        └──────────── connection moves to another server ──────┘
//! ```
//!
//! 1. **Host.**  The player software keeps a TCP connection to the server's
//!    port 3483, so the server address is read from the kernel connection
//!    table.  This is done at most once per search interval; the first poll
//!    searches immediately.
//! 2. **Port.**  A discovery request is sent to UDP 3483 of that address.
//!    Every poll then checks, without blocking, for the reply carrying the
//!    control port.
//!
//! Fields the user configured are never touched.  With both host and port
//! configured, `poll` does nothing.  With only the host configured, the
//! request goes to the configured host and is repeated once per search
//! interval until a reply arrives.
//!
//! Failures (table unreadable, malformed rows, bad replies) are logged and the
//! search simply continues on a later poll.

use std::net::Ipv4Addr;

use sbpd_core::{
    parse_reply, ConfigParameters, DiscoveryProtocolError, ServerEndpoint, TcpTableError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error type for the discovery I/O seams.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("connection table unavailable: {0}")]
    TableUnavailable(#[source] std::io::Error),

    #[error(transparent)]
    Table(#[from] TcpTableError),

    #[error(transparent)]
    Reply(#[from] DiscoveryProtocolError),

    #[error("discovery socket error: {0}")]
    Socket(#[from] std::io::Error),
}

/// Source of the server address: the player's open connection to it.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionTable: Send {
    /// Remote address of the first connection to the server port, if any.
    fn server_address(&mut self) -> Result<Option<Ipv4Addr>, DiscoveryError>;
}

/// UDP exchange with the server's discovery responder.
#[cfg_attr(test, mockall::automock)]
pub trait DiscoveryChannel: Send {
    /// Sends a discovery request to `host`, replacing any earlier request.
    fn send_request(&mut self, host: &str) -> Result<(), DiscoveryError>;

    /// Returns a received datagram, or `None` if nothing has arrived yet.
    /// Never blocks.
    fn poll_reply(&mut self) -> Result<Option<Vec<u8>>, DiscoveryError>;

    /// Releases the request socket.
    fn close(&mut self);
}

/// Coarse state of the search, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    SearchingHost,
    SearchingPort,
    Resolved,
}

/// The discovery state machine.
pub struct Discovery<T: ConnectionTable, C: DiscoveryChannel> {
    table: T,
    channel: C,
    configured: ConfigParameters,
    discovered: ConfigParameters,
    /// Polls between two host searches.
    search_ticks: u32,
    /// Polls left until the next host search; 0 means "search now".
    countdown: u32,
    /// Address found in the connection table, written to the endpoint once
    /// the port is known (or immediately when the port is configured).
    found_address: Option<Ipv4Addr>,
}

impl<T: ConnectionTable, C: DiscoveryChannel> Discovery<T, C> {
    pub fn new(table: T, channel: C, configured: ConfigParameters, search_ticks: u32) -> Self {
        Self {
            table,
            channel,
            configured,
            discovered: ConfigParameters::empty(),
            search_ticks: search_ticks.max(1),
            countdown: 0,
            found_address: None,
        }
    }

    /// Parameters learned at runtime so far.
    pub fn discovered(&self) -> ConfigParameters {
        self.discovered
    }

    /// Records parameters discovered outside this state machine (the MAC).
    pub fn mark_discovered(&mut self, flags: u16) {
        self.discovered.insert(flags);
    }

    pub fn phase(&self) -> DiscoveryPhase {
        let known = ConfigParameters(self.configured.0 | self.discovered.0);
        if known.contains(ConfigParameters::HOST | ConfigParameters::PORT) {
            DiscoveryPhase::Resolved
        } else if known.contains(ConfigParameters::HOST) {
            DiscoveryPhase::SearchingPort
        } else {
            DiscoveryPhase::SearchingHost
        }
    }

    /// Advances the search by one main-loop iteration, writing any newly
    /// found host or port into `endpoint`.
    pub fn poll(&mut self, endpoint: &mut ServerEndpoint) {
        let host_configured = self.configured.contains(ConfigParameters::HOST);
        let port_configured = self.configured.contains(ConfigParameters::PORT);
        if host_configured && port_configured {
            return;
        }

        if self.tick() {
            if host_configured {
                self.request_port_from_configured_host(endpoint);
            } else {
                self.search_host(endpoint, port_configured);
            }
        }

        if !port_configured && !self.discovered.contains(ConfigParameters::PORT) {
            self.search_port(endpoint, host_configured);
        }
    }

    /// Counts down one poll; returns `true` when a search is due.
    fn tick(&mut self) -> bool {
        if self.countdown == 0 {
            self.countdown = self.search_ticks;
            true
        } else {
            self.countdown -= 1;
            false
        }
    }

    fn search_host(&mut self, endpoint: &mut ServerEndpoint, port_configured: bool) {
        let address = match self.table.server_address() {
            Ok(Some(address)) => address,
            Ok(None) => {
                debug!("no server connection found");
                return;
            }
            Err(e) => {
                warn!(error = %e, "server address search failed");
                return;
            }
        };

        let current = endpoint.host.as_deref().and_then(|h| h.parse::<Ipv4Addr>().ok());
        if current == Some(address) {
            debug!(%address, "server address unchanged");
            return;
        }

        info!(%address, "new or changed server address found");
        self.discovered.insert(ConfigParameters::HOST);
        self.discovered.remove(ConfigParameters::PORT);
        self.found_address = Some(address);

        if port_configured {
            endpoint.host = Some(address.to_string());
            info!(host = %address, "server address set");
        } else {
            self.send_request(&address.to_string());
        }
    }

    fn request_port_from_configured_host(&mut self, endpoint: &ServerEndpoint) {
        if self.discovered.contains(ConfigParameters::PORT) {
            return;
        }
        if let Some(host) = endpoint.host.clone() {
            self.send_request(&host);
        }
    }

    fn send_request(&mut self, host: &str) {
        match self.channel.send_request(host) {
            Ok(()) => debug!(host, "discovery request sent"),
            Err(e) => warn!(host, error = %e, "discovery request failed"),
        }
    }

    fn search_port(&mut self, endpoint: &mut ServerEndpoint, host_configured: bool) {
        let datagram = match self.channel.poll_reply() {
            Ok(Some(datagram)) => datagram,
            Ok(None) => return,
            Err(e) => {
                debug!(error = %e, "discovery receive failed");
                return;
            }
        };

        let reply = match parse_reply(&datagram) {
            Ok(reply) => reply,
            Err(e) => {
                debug!(error = %e, "ignoring discovery datagram");
                return;
            }
        };
        self.channel.close();

        debug!(
            name = reply.name.as_deref().unwrap_or_default(),
            uuid = reply.uuid.as_deref().unwrap_or_default(),
            address = reply.address.as_deref().unwrap_or_default(),
            "discovery reply"
        );
        info!(port = reply.control_port, "server control port found");

        if !host_configured {
            if let Some(address) = self.found_address {
                endpoint.host = Some(address.to_string());
                info!(host = %address, "server address set");
            }
        }
        endpoint.port = Some(reply.control_port);
        self.discovered.insert(ConfigParameters::PORT);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
