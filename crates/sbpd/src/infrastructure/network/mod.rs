//! Network infrastructure for the daemon.
//!
//! # Sub-modules
//!
//! - **`tcp_table`** – Reads `/proc/net/tcp` to find the address of the server
//!   the local player is connected to.
//!
//! - **`discovery`** – Sends the UDP discovery request to the server and picks
//!   up its reply without blocking the main loop.
//!
//! - **`identity`** – Looks up the MAC address the player registers with,
//!   which every command is addressed to.

pub mod discovery;
pub mod identity;
pub mod tcp_table;
