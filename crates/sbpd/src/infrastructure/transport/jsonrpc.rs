//! JSON-RPC over HTTP/1.1 to the server's `/jsonrpc.js` endpoint.
//!
//! One connection per command: connect, write the request with
//! `Connection: close`, read until the server closes.  The whole exchange is
//! bounded by the configured timeout.
//!
//! Only the status line decides the outcome; the body is kept for debug
//! logging as received.  There is no keep-alive, redirect handling or
//! `Transfer-Encoding: chunked` decoding, so a chunked body is logged with its
//! chunk-size lines.
//!
//! By default a command counts as delivered as soon as the endpoint is known,
//! whatever happens on the wire; failures are only logged.  With
//! `report_transport_failures` set, connection errors, timeouts and non-2xx
//! statuses are reported back as failed dispatches instead.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sbpd_core::protocol::rpc::build_request;
use sbpd_core::ServerEndpoint;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::application::control::{CommandSender, DispatchError};

/// Sent as `User-Agent` with every request.
pub const USER_AGENT: &str = concat!("SqueezeButtonPi/", env!("CARGO_PKG_VERSION"));

/// Path of the server's JSON-RPC endpoint.
pub const JSONRPC_PATH: &str = "/jsonrpc.js";

/// Errors produced by a single HTTP exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid command fragment: {0}")]
    InvalidFragment(#[from] serde_json::Error),

    #[error("failed to connect to {authority}: {source}")]
    Connect {
        authority: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("malformed HTTP response: {0:?}")]
    MalformedResponse(String),

    #[error("server answered {status}: {reason}")]
    Status { status: u16, reason: String },
}

/// Settings for [`JsonRpcClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    pub timeout: Duration,
    pub report_failures: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            report_failures: false,
        }
    }
}

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Posts player commands to the server.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    mac: String,
    options: TransportOptions,
}

impl JsonRpcClient {
    /// Creates a client sending commands on behalf of the player `mac`.
    pub fn new(mac: impl Into<String>, options: TransportOptions) -> Self {
        Self {
            mac: mac.into(),
            options,
        }
    }

    pub fn mac(&self) -> &str {
        &self.mac
    }

    /// Builds the raw HTTP request carrying `fragment` to `authority`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidFragment`] if `fragment` is not JSON.
    pub fn build_http_request(
        &self,
        authority: &str,
        credentials: Option<(&str, &str)>,
        fragment: &str,
    ) -> Result<String, TransportError> {
        let body = build_request(&self.mac, fragment)?;

        let mut request = format!(
            "POST {JSONRPC_PATH} HTTP/1.1\r\n\
             Host: {authority}\r\n\
             User-Agent: {USER_AGENT}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n",
            body.len()
        );
        if let Some((user, password)) = credentials {
            let token = STANDARD.encode(format!("{user}:{password}"));
            request.push_str(&format!("Authorization: Basic {token}\r\n"));
        }
        request.push_str("Connection: close\r\n\r\n");
        request.push_str(&body);
        Ok(request)
    }

    /// Performs one HTTP exchange with the server at `authority` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request cannot be built, the
    /// connection fails, the exchange exceeds the timeout, or the response
    /// has no valid status line.
    pub async fn post(
        &self,
        authority: &str,
        credentials: Option<(&str, &str)>,
        fragment: &str,
    ) -> Result<HttpResponse, TransportError> {
        let request = self.build_http_request(authority, credentials, fragment)?;
        debug!(authority, fragment, "sending command");

        let exchange = async {
            let mut stream = TcpStream::connect(authority).await.map_err(|source| {
                TransportError::Connect {
                    authority: authority.to_string(),
                    source,
                }
            })?;
            stream.write_all(request.as_bytes()).await?;
            stream.flush().await?;

            let mut raw = Vec::new();
            stream.read_to_end(&mut raw).await?;
            Ok::<_, TransportError>(raw)
        };

        let raw = tokio::time::timeout(self.options.timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout(self.options.timeout))??;

        let response = parse_response(&raw)?;
        debug!(
            status = response.status,
            body = %response.body,
            "server response"
        );
        Ok(response)
    }
}

/// Splits a raw HTTP/1.x response into status line and body.
///
/// The body is everything after the header block, undecoded.
///
/// # Errors
///
/// Returns [`TransportError::MalformedResponse`] when the status line is
/// missing or not `HTTP/<version> <code> [reason]`.
pub fn parse_response(raw: &[u8]) -> Result<HttpResponse, TransportError> {
    let text = String::from_utf8_lossy(raw);
    let (head, body) = text.split_once("\r\n\r\n").unwrap_or((&*text, ""));
    let status_line = head.lines().next().unwrap_or_default();

    let malformed = || TransportError::MalformedResponse(status_line.to_string());
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().ok_or_else(malformed)?;
    if !version.starts_with("HTTP/") {
        return Err(malformed());
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(malformed)?;
    let reason = parts.next().unwrap_or_default().to_string();

    Ok(HttpResponse {
        status,
        reason,
        body: body.to_string(),
    })
}

#[async_trait]
impl CommandSender for JsonRpcClient {
    async fn send(&self, endpoint: &ServerEndpoint, fragment: &str) -> Result<(), DispatchError> {
        let Some(authority) = endpoint.authority() else {
            debug!(fragment, "server not resolved yet, command dropped");
            return Err(DispatchError::TransportUnavailable);
        };

        let outcome = match self.post(&authority, endpoint.credentials(), fragment).await {
            Ok(response) if response.is_success() => return Ok(()),
            Ok(response) => TransportError::Status {
                status: response.status,
                reason: response.reason,
            },
            Err(e) => e,
        };

        warn!(%authority, fragment, error = %outcome, "command delivery failed");
        if self.options.report_failures {
            Err(DispatchError::Failed(outcome.to_string()))
        } else {
            Ok(())
        }
    }
}
