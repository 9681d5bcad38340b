//! Application layer use cases for the daemon.
//!
//! Nothing in here touches GPIO, sockets, or files directly.  Hardware comes in
//! through [`sbpd_core::PinBackend`], commands go out through
//! [`control::CommandSender`], and discovery talks to the outside world through
//! [`discovery::ConnectionTable`] and [`discovery::DiscoveryChannel`].
//!
//! # Sub-modules
//!
//! - **`control`** – Binds control specifications to registry slots and turns
//!   pending button presses and accumulated encoder movement into command
//!   fragments on every poll cycle.
//!
//! - **`discovery`** – The host/port search state machine that fills in the
//!   server endpoint as the server becomes visible.

pub mod control;
pub mod discovery;
