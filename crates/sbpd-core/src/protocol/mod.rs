//! Wire and text formats exchanged with the media server and the kernel.

pub mod discovery;
pub mod rpc;
pub mod tcp_table;

pub use discovery::{parse_reply, DiscoveryProtocolError, DiscoveryReply, DISCOVERY_REQUEST};
pub use rpc::build_request;
pub use tcp_table::{find_server_address, TcpTableError};

/// Port of the server's player protocol (SlimProto, TCP) and of its UDP
/// discovery responder.
pub const SERVER_PORT: u16 = 3483;
