//! Scanning the kernel's TCP connection table for the server address.
//!
//! When the player software is connected to the server, the kernel lists that
//! connection in `/proc/net/tcp`.  Each row after the header looks like:
//!
//! ```text
//!   sl  local_address rem_address   st ...
//!    0: 0F02000A:A1B2 1402A8C0:0D9B 01 ...
//! ```
//!
//! Addresses are `HEXIP:HEXPORT`.  The IP is the raw 32-bit value as the kernel
//! stores it, so on little-endian hosts `0100007F` reads as `127.0.0.1`.  The
//! port is big-endian hex, and 3483 is `0D9B`.

use std::net::Ipv4Addr;

use thiserror::Error;

use super::SERVER_PORT;

/// Zero-based column holding the remote address.
const REMOTE_ADDRESS_COLUMN: usize = 2;

/// Errors produced while reading a TCP table row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TcpTableError {
    #[error("line {line}: missing remote address column")]
    MissingColumn { line: usize },

    #[error("line {line}: malformed remote address {value:?}")]
    MalformedAddress { line: usize, value: String },
}

/// Returns the remote IPv4 address of the first connection whose remote port
/// is the server port, or `None` if there is no such connection.
///
/// The first line is treated as the column header and skipped.  Blank lines
/// are ignored.
///
/// # Errors
///
/// Returns [`TcpTableError`] for a row without a remote address column or
/// with an address that is not `HEXIP:HEXPORT`.  The scan stops at that row.
pub fn find_server_address(table: &str) -> Result<Option<Ipv4Addr>, TcpTableError> {
    let wanted_port = format!("{SERVER_PORT:04X}");

    for (index, row) in table.lines().enumerate().skip(1) {
        let line = index + 1;
        if row.trim().is_empty() {
            continue;
        }

        let remote = row
            .split_whitespace()
            .nth(REMOTE_ADDRESS_COLUMN)
            .ok_or(TcpTableError::MissingColumn { line })?;
        let malformed = || TcpTableError::MalformedAddress {
            line,
            value: remote.to_string(),
        };

        let (hex_ip, hex_port) = remote.split_once(':').ok_or_else(malformed)?;
        if !hex_port.eq_ignore_ascii_case(&wanted_port) {
            continue;
        }
        if hex_ip.len() != 8 {
            return Err(malformed());
        }
        let raw = u32::from_str_radix(hex_ip, 16).map_err(|_| malformed())?;
        return Ok(Some(kernel_ipv4(raw)));
    }

    Ok(None)
}

/// Converts the kernel's printed address word into an [`Ipv4Addr`].
///
/// `/proc/net/tcp` prints the in-memory (network order) word as a host
/// integer, so on little-endian machines the octets come out reversed.
fn kernel_ipv4(raw: u32) -> Ipv4Addr {
    if cfg!(target_endian = "little") {
        Ipv4Addr::from(raw.swap_bytes())
    } else {
        Ipv4Addr::from(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

    fn table(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_finds_server_connection() {
        // Arrange
        let contents = table(&[
            "   0: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 1234",
            "   1: 0F02A8C0:C1F4 1402A8C0:0D9B 01 00000000:00000000 00:00000000 00000000  1000        0 5678",
        ]);

        // Act
        let found = find_server_address(&contents);

        // Assert
        assert_eq!(found, Ok(Some(Ipv4Addr::new(192, 168, 2, 20))));
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_loopback_row_decodes_to_localhost() {
        let contents = table(&["   0: 0100007F:9C40 0100007F:0D9B 01 0 0 0 0 0"]);

        assert_eq!(
            find_server_address(&contents),
            Ok(Some(Ipv4Addr::LOCALHOST))
        );
    }

    #[test]
    fn test_port_match_is_case_insensitive() {
        let contents = table(&["   0: 0100007F:9C40 0100007F:0d9b 01"]);

        assert!(find_server_address(&contents).unwrap().is_some());
    }

    #[test]
    fn test_no_matching_port_returns_none() {
        let contents = table(&[
            "   0: 0100007F:9C40 0100007F:1F90 01",
            "   1: 0100007F:9C41 0100007F:0050 01",
        ]);

        assert_eq!(find_server_address(&contents), Ok(None));
    }

    #[test]
    fn test_header_only_returns_none() {
        assert_eq!(find_server_address(HEADER), Ok(None));
        assert_eq!(find_server_address(""), Ok(None));
    }

    #[test]
    fn test_header_line_is_never_matched() {
        // A header that happens to contain the port must still be skipped.
        let contents = "0: 0100007F:9C40 0100007F:0D9B 01";

        assert_eq!(find_server_address(contents), Ok(None));
    }

    #[test]
    fn test_row_without_remote_column_is_an_error() {
        let contents = table(&["   0: 0100007F:9C40"]);

        assert_eq!(
            find_server_address(&contents),
            Err(TcpTableError::MissingColumn { line: 2 })
        );
    }

    #[test]
    fn test_malformed_address_aborts_scan() {
        let contents = table(&[
            "   0: 0100007F:9C40 0100007F 01",
            "   1: 0100007F:9C41 0100007F:0D9B 01",
        ]);

        assert!(matches!(
            find_server_address(&contents),
            Err(TcpTableError::MalformedAddress { line: 2, .. })
        ));
    }

    #[test]
    fn test_non_hex_ip_on_matching_port_is_an_error() {
        let contents = table(&["   0: 0100007F:9C40 ZZ00007F:0D9B 01"]);

        assert!(find_server_address(&contents).is_err());
    }
}
