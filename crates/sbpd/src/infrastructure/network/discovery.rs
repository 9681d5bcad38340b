//! UDP discovery channel to the server's discovery responder.
//!
//! A request opens a fresh socket bound to an ephemeral port (broadcast
//! enabled, so a broadcast address works as a target too) and sends the
//! 23-byte request to UDP port 3483.  The socket is non-blocking; each
//! [`poll_reply`](DiscoveryChannel::poll_reply) performs one `recv_from` and
//! reports "nothing yet" on `WouldBlock`.  The socket is dropped when a new
//! request replaces it or when the state machine closes it after a valid
//! reply.

use std::net::UdpSocket;

use sbpd_core::protocol::discovery::DISCOVERY_REQUEST;
use sbpd_core::SERVER_PORT;
use tracing::debug;

use crate::application::discovery::{DiscoveryChannel, DiscoveryError};

/// Large enough for any reply (Ethernet MTU).
const RECV_BUFFER_SIZE: usize = 1600;

/// Non-blocking UDP implementation of [`DiscoveryChannel`].
#[derive(Debug)]
pub struct UdpDiscoveryChannel {
    port: u16,
    socket: Option<UdpSocket>,
}

impl UdpDiscoveryChannel {
    pub fn new() -> Self {
        Self::with_port(SERVER_PORT)
    }

    /// Sends requests to `port` instead of 3483.
    pub fn with_port(port: u16) -> Self {
        Self { port, socket: None }
    }

    /// Whether a request is outstanding.
    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }
}

impl Default for UdpDiscoveryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryChannel for UdpDiscoveryChannel {
    fn send_request(&mut self, host: &str) -> Result<(), DiscoveryError> {
        self.socket = None;

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;
        let sent = socket.send_to(DISCOVERY_REQUEST, (host, self.port))?;
        debug!(host, port = self.port, bytes = sent, "discovery datagram sent");

        self.socket = Some(socket);
        Ok(())
    }

    fn poll_reply(&mut self) -> Result<Option<Vec<u8>>, DiscoveryError> {
        let Some(socket) = &self.socket else {
            return Ok(None);
        };

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        match socket.recv_from(&mut buf) {
            Ok((len, src)) => {
                debug!(%src, len, "discovery datagram received");
                Ok(Some(buf[..len].to_vec()))
            }
            Err(e) if is_timeout_error(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        self.socket = None;
    }
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}
