//! Integration tests for server discovery with real files and sockets.
//!
//! A temporary file stands in for `/proc/net/tcp` and a UDP socket on
//! localhost plays the server's discovery responder, so the whole path
//! (connection table → request → reply → endpoint) runs as in the daemon.

use std::net::{Ipv4Addr, UdpSocket};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use sbpd::application::discovery::{Discovery, DiscoveryPhase};
use sbpd::infrastructure::network::discovery::UdpDiscoveryChannel;
use sbpd::infrastructure::network::tcp_table::ProcTcpTable;
use sbpd_core::protocol::discovery::{encode_reply, DISCOVERY_REQUEST, TAG_JSON_PORT, TAG_NAME};
use sbpd_core::{ConfigParameters, ServerEndpoint};

const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

/// Writes a connection table with one established connection to `remote`.
fn write_table(name: &str, remote: Ipv4Addr, remote_port: u16) -> PathBuf {
    // The kernel prints the address as the in-memory u32 in native order.
    let address = format!("{:08X}", u32::from_ne_bytes(remote.octets()));
    let contents = format!(
        "{HEADER}\n   0: 0100007F:C350 {address}:{remote_port:04X} 01 00000000:00000000 00:00000000 00000000  1000        0 4242 1\n"
    );
    let path = std::env::temp_dir().join(format!("sbpd-it-{name}-{}.tcp", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

/// Answers the first discovery request with a reply carrying `json_port`.
fn spawn_responder(json_port: &'static [u8]) -> (u16, thread::JoinHandle<Vec<u8>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let port = socket.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let mut buf = [0u8; 64];
        let (len, src) = socket.recv_from(&mut buf).unwrap();
        let reply = encode_reply(&[(TAG_NAME, b"test-server"), (TAG_JSON_PORT, json_port)]);
        socket.send_to(&reply, src).unwrap();
        buf[..len].to_vec()
    });
    (port, handle)
}

fn poll_until_resolved(
    discovery: &mut Discovery<ProcTcpTable, UdpDiscoveryChannel>,
    endpoint: &mut ServerEndpoint,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline && discovery.phase() != DiscoveryPhase::Resolved {
        discovery.poll(endpoint);
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_discovers_host_and_port_from_table_and_reply() {
    // Arrange
    let table = write_table("full", Ipv4Addr::LOCALHOST, 3483);
    let (port, responder) = spawn_responder(b"9010");
    let mut discovery = Discovery::new(
        ProcTcpTable::with_path(&table),
        UdpDiscoveryChannel::with_port(port),
        ConfigParameters::empty(),
        30,
    );
    let mut endpoint = ServerEndpoint::default();

    // Act
    poll_until_resolved(&mut discovery, &mut endpoint);
    let request = responder.join().unwrap();
    let _ = std::fs::remove_file(&table);

    // Assert
    assert_eq!(request, DISCOVERY_REQUEST.to_vec());
    assert_eq!(endpoint.host.as_deref(), Some("127.0.0.1"));
    assert_eq!(endpoint.port, Some(9010));
    assert!(discovery.discovered().contains(ConfigParameters::HOST | ConfigParameters::PORT));
}

#[test]
fn test_configured_port_skips_the_udp_exchange() {
    // Arrange
    let table = write_table("port", Ipv4Addr::LOCALHOST, 3483);
    let mut configured = ConfigParameters::empty();
    configured.insert(ConfigParameters::PORT);
    let mut discovery = Discovery::new(
        ProcTcpTable::with_path(&table),
        UdpDiscoveryChannel::new(),
        configured,
        30,
    );
    let mut endpoint = ServerEndpoint {
        port: Some(9000),
        ..ServerEndpoint::default()
    };

    // Act
    discovery.poll(&mut endpoint);
    let _ = std::fs::remove_file(&table);

    // Assert
    assert_eq!(endpoint.host.as_deref(), Some("127.0.0.1"));
    assert_eq!(endpoint.port, Some(9000));
    assert_eq!(discovery.phase(), DiscoveryPhase::Resolved);
}

#[test]
fn test_connection_to_other_port_is_ignored() {
    // Arrange
    let table = write_table("other", Ipv4Addr::LOCALHOST, 9000);
    let mut discovery = Discovery::new(
        ProcTcpTable::with_path(&table),
        UdpDiscoveryChannel::new(),
        ConfigParameters::empty(),
        30,
    );
    let mut endpoint = ServerEndpoint::default();

    // Act
    discovery.poll(&mut endpoint);
    let _ = std::fs::remove_file(&table);

    // Assert
    assert_eq!(endpoint, ServerEndpoint::default());
    assert_eq!(discovery.phase(), DiscoveryPhase::SearchingHost);
}
