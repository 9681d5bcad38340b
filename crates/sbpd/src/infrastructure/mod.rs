//! Infrastructure layer for the daemon.
//!
//! Contains OS-facing adapters: the GPIO driver, discovery sockets and the
//! kernel connection table, configuration files, and the HTTP client that
//! posts commands to the server.
//!
//! **Dependency rule**: this layer may depend on `application` and `sbpd_core`,
//! but MUST NOT be imported by the `application` layer.

pub mod gpio;
pub mod network;
pub mod storage;
pub mod transport;
