//! Integration tests for sbpd-core.
//!
//! These drive the public API the way the daemon does: control specifications
//! are parsed, registered against a mock GPIO backend, and exercised by
//! changing pin levels.  The discovery formats are checked against realistic
//! kernel and server output.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use sbpd_core::gpio::mock::MockPinBackend;
use sbpd_core::protocol::discovery::{encode_reply, TAG_JSON_PORT, TAG_NAME};
use sbpd_core::protocol::rpc::build_request;
use sbpd_core::{
    find_server_address, parse_reply, volume_fragment, ButtonCommand, ControlSpec, Edge,
    InputRegistry, DiscoveryProtocolError,
};

/// Turns the encoder on `(a, b)` one detent clockwise (four quadrature steps).
fn turn_clockwise(backend: &MockPinBackend, a: u8, b: u8) {
    backend.set_level(a, true);
    backend.set_level(b, true);
    backend.set_level(a, false);
    backend.set_level(b, false);
}

fn turn_counter_clockwise(backend: &MockPinBackend, a: u8, b: u8) {
    backend.set_level(b, true);
    backend.set_level(a, true);
    backend.set_level(b, false);
    backend.set_level(a, false);
}

#[test]
fn test_button_spec_registers_and_reports_press() {
    // Arrange
    let backend = MockPinBackend::new();
    let mut registry = InputRegistry::new(backend.clone());
    let spec: ControlSpec = "b,17,VOL+".parse().unwrap();
    let ControlSpec::Button { pin, command, edge } = spec else {
        panic!("expected a button spec");
    };
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    let handle = registry
        .register_button(
            pin,
            Arc::new(move |_, change| sink.lock().unwrap().push(change)),
            edge,
        )
        .unwrap();

    // Act
    backend.set_level(17, true);
    backend.set_level(17, false);

    // Assert
    assert_eq!(*changes.lock().unwrap(), vec![1, -1]);
    assert!(!registry.button_level(handle));
    assert_eq!(
        ButtonCommand::from_code(&command).unwrap().fragment(),
        r#"["button","volume_up"]"#
    );
}

#[test]
fn test_encoder_spec_accumulates_rotation() {
    // Arrange
    let backend = MockPinBackend::new();
    let mut registry = InputRegistry::new(backend.clone());
    let ControlSpec::Encoder { pin_a, pin_b, edge, .. } = "e,23,24".parse().unwrap() else {
        panic!("expected an encoder spec");
    };
    let handle = registry
        .register_encoder(pin_a, pin_b, Arc::new(|_, _, _| {}), edge)
        .unwrap();

    // Act
    turn_clockwise(&backend, 23, 24);
    turn_clockwise(&backend, 23, 24);
    turn_counter_clockwise(&backend, 23, 24);

    // Assert
    assert_eq!(edge, Edge::Both);
    assert_eq!(registry.encoder_value(handle), 4);
}

#[test]
fn test_encoder_delta_becomes_volume_request() {
    let backend = MockPinBackend::new();
    let mut registry = InputRegistry::new(backend.clone());
    let handle = registry
        .register_encoder(5, 6, Arc::new(|_, _, _| {}), Edge::Both)
        .unwrap();

    backend.set_level(5, true);
    backend.set_level(6, true);
    backend.set_level(5, false);
    let body = build_request(
        "b8:27:eb:00:00:01",
        &volume_fragment(registry.encoder_value(handle)),
    )
    .unwrap();

    assert_eq!(
        body,
        r#"{"id":1,"method":"slim.request","params":["b8:27:eb:00:00:01",["mixer","volume","+3"]]}"#
    );
}

#[test]
fn test_kernel_table_and_server_reply_resolve_endpoint() {
    // Arrange
    let table = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n\
                 \x20  0: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 1\n\
                 \x20  1: 0F02A8C0:C1F4 1402A8C0:0D9B 01 00000000:00000000 00:00000000 00000000  1000        0 2\n";
    let datagram = encode_reply(&[(TAG_NAME, b"den"), (TAG_JSON_PORT, b"9000")]);

    // Act
    let address = find_server_address(table).unwrap();
    let reply = parse_reply(&datagram).unwrap();

    // Assert
    if cfg!(target_endian = "little") {
        assert_eq!(address, Some(Ipv4Addr::new(192, 168, 2, 20)));
    } else {
        assert!(address.is_some());
    }
    assert_eq!(reply.control_port, 9000);
    assert_eq!(reply.name.as_deref(), Some("den"));
}

#[test]
fn test_reply_with_garbage_port_is_rejected() {
    let datagram = encode_reply(&[(TAG_JSON_PORT, b"abc")]);

    assert_eq!(
        parse_reply(&datagram),
        Err(DiscoveryProtocolError::InvalidPort("abc".to_string()))
    );
}
