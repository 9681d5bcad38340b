//! # sbpd-core
//!
//! Shared library for the SqueezeButtonPi daemon containing the hardware input
//! registry, the server discovery wire formats, and the domain types that the
//! daemon's application layer works with.
//!
//! It has no dependencies on sockets, files, or a particular GPIO driver.
//! Hardware is reached through the [`gpio::PinBackend`] trait, so everything in
//! here can be unit-tested on a development machine.
//!
//! # Architecture overview
//!
//! The daemon turns physical buttons and rotary encoders wired to a Raspberry
//! Pi into remote-control commands for a Squeezebox / Logitech Media Server,
//! and finds that server on the LAN by itself.
//!
//! - **`gpio`** – Fixed-capacity pools of buttons and encoders.  Interrupt
//!   handlers update per-device atomics (button level, encoder counter) that
//!   the poll loop reads without locking.  Quadrature decoding lives here.
//!
//! - **`protocol`** – Byte- and text-level formats: the UDP discovery
//!   request/reply (tag-length-value records), the kernel TCP connection
//!   table, and the JSON-RPC envelope posted to the server.
//!
//! - **`domain`** – Plain data: the server endpoint, the configured /
//!   discovered parameter flags, button commands, edge policies, and the
//!   `b,<pin>,<CMD>` / `e,<a>,<b>,<CMD>` control specifications.

pub mod domain;
pub mod gpio;
pub mod protocol;

pub use domain::command::{volume_fragment, ButtonCommand, CommandError};
pub use domain::control_spec::{ControlSpec, ControlSpecError};
pub use domain::edge::Edge;
pub use domain::server::{ConfigParameters, ServerEndpoint};
pub use gpio::registry::{ButtonHandle, EncoderHandle, InputError, InputRegistry};
pub use gpio::PinBackend;
pub use protocol::discovery::{parse_reply, DiscoveryProtocolError, DiscoveryReply};
pub use protocol::tcp_table::{find_server_address, TcpTableError};
pub use protocol::SERVER_PORT;
