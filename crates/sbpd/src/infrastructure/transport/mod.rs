//! Command transport to the media server.
//!
//! The server accepts player commands as JSON-RPC over plain HTTP on its
//! control port (`POST /jsonrpc.js`).  `jsonrpc` implements the
//! application layer's `CommandSender` on top of a short-lived
//! `tokio::net::TcpStream` per command.

pub mod jsonrpc;
