//! Server discovery datagrams.
//!
//! The daemon asks the server for its control port by sending a fixed request
//! to UDP port 3483.  Wire format:
//!
//! ```text
//! request: 'e' { tag:4 0x00 }*            tags IPAD NAME JSON UUID, then padding
//! reply:   'E' { tag:4 len:1 value:len }*  until the end of the datagram
//! ```
//!
//! Tags are four ASCII characters.  In a request every tag is followed by a
//! zero length byte, meaning "please fill this in".  In the reply the values
//! are ASCII text:
//!
//! | tag    | value                                   |
//! |--------|-----------------------------------------|
//! | `IPAD` | server IP address                       |
//! | `NAME` | server name                             |
//! | `JSON` | JSON-RPC (HTTP) control port, decimal   |
//! | `UUID` | server UUID                             |

use thiserror::Error;

/// The 23-byte discovery request asking for IPAD, NAME, JSON and UUID.
pub const DISCOVERY_REQUEST: &[u8; 23] = b"eIPAD\0NAME\0JSON\0UUID\0\0\0";

/// First byte of every discovery reply.
pub const REPLY_MARKER: u8 = b'E';

/// Control port assumed when a reply carries no `JSON` record.
pub const DEFAULT_CONTROL_PORT: u16 = 9000;

/// Tag (4 bytes) plus length (1 byte).
const RECORD_HEADER_LEN: usize = 5;

pub const TAG_ADDRESS: [u8; 4] = *b"IPAD";
pub const TAG_NAME: [u8; 4] = *b"NAME";
pub const TAG_JSON_PORT: [u8; 4] = *b"JSON";
pub const TAG_UUID: [u8; 4] = *b"UUID";

/// Errors produced while parsing a discovery reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryProtocolError {
    #[error("empty datagram")]
    Empty,

    /// The first byte is not the reply marker `'E'`.
    #[error("not a discovery reply: first byte 0x{0:02X}")]
    NotAReply(u8),

    /// A record's declared length runs past the end of the datagram.
    #[error("record {tag} declares {declared} bytes but only {available} remain")]
    Truncated {
        tag: String,
        declared: usize,
        available: usize,
    },

    /// The `JSON` record does not hold a usable port number.
    #[error("invalid control port {0:?}")]
    InvalidPort(String),
}

/// One tag-length-value record borrowed from a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub tag: [u8; 4],
    pub value: &'a [u8],
}

impl Record<'_> {
    /// The value as text, without trailing NUL padding.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.value)
            .trim_end_matches('\0')
            .to_string()
    }
}

/// Fields extracted from a discovery reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReply {
    /// JSON-RPC control port; [`DEFAULT_CONTROL_PORT`] if not advertised.
    pub control_port: u16,
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub address: Option<String>,
}

/// Iterates over the records of a reply body (the bytes after the marker).
///
/// A trailing fragment shorter than a record header is ignored.
pub fn records(body: &[u8]) -> Records<'_> {
    Records { body, pos: 0 }
}

/// Iterator returned by [`records`].
pub struct Records<'a> {
    body: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>, DiscoveryProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.body.len().saturating_sub(self.pos) < RECORD_HEADER_LEN {
            return None;
        }
        let header = &self.body[self.pos..self.pos + RECORD_HEADER_LEN];
        let tag = [header[0], header[1], header[2], header[3]];
        let declared = header[4] as usize;

        let start = self.pos + RECORD_HEADER_LEN;
        let available = self.body.len() - start;
        if declared > available {
            // Stop iterating after reporting the error.
            self.pos = self.body.len();
            return Some(Err(DiscoveryProtocolError::Truncated {
                tag: String::from_utf8_lossy(&tag).into_owned(),
                declared,
                available,
            }));
        }

        self.pos = start + declared;
        Some(Ok(Record {
            tag,
            value: &self.body[start..start + declared],
        }))
    }
}

/// Parses a discovery reply datagram.
///
/// # Errors
///
/// Returns [`DiscoveryProtocolError`] if the datagram is empty, does not start
/// with `'E'`, has a record running past its end, or advertises a port that
/// is not a positive decimal number.
pub fn parse_reply(datagram: &[u8]) -> Result<DiscoveryReply, DiscoveryProtocolError> {
    let (&marker, body) = datagram
        .split_first()
        .ok_or(DiscoveryProtocolError::Empty)?;
    if marker != REPLY_MARKER {
        return Err(DiscoveryProtocolError::NotAReply(marker));
    }

    let mut reply = DiscoveryReply {
        control_port: DEFAULT_CONTROL_PORT,
        name: None,
        uuid: None,
        address: None,
    };

    for record in records(body) {
        let record = record?;
        match record.tag {
            TAG_JSON_PORT => reply.control_port = parse_port(&record.text())?,
            TAG_NAME => reply.name = Some(record.text()),
            TAG_UUID => reply.uuid = Some(record.text()),
            TAG_ADDRESS => reply.address = Some(record.text()),
            _ => {}
        }
    }

    Ok(reply)
}

/// Parses the leading decimal digits of `text` as a port number.
fn parse_port(text: &str) -> Result<u16, DiscoveryProtocolError> {
    let trimmed = text.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    match trimmed[..digits_end].parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(DiscoveryProtocolError::InvalidPort(text.to_string())),
    }
}

/// Builds a reply datagram from `(tag, value)` pairs.
///
/// This is what the server's discovery responder sends; the daemon only uses
/// it in tests and benchmarks.  Values longer than 255 bytes are truncated.
pub fn encode_reply(fields: &[([u8; 4], &[u8])]) -> Vec<u8> {
    let mut buf = vec![REPLY_MARKER];
    for (tag, value) in fields {
        let len = value.len().min(u8::MAX as usize);
        buf.extend_from_slice(tag);
        buf.push(len as u8);
        buf.extend_from_slice(&value[..len]);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_23_bytes_with_four_tags() {
        // Arrange / Act
        let tags: Vec<&[u8]> = DISCOVERY_REQUEST[1..].split(|b| *b == 0).collect();

        // Assert
        assert_eq!(DISCOVERY_REQUEST.len(), 23);
        assert_eq!(DISCOVERY_REQUEST[0], b'e');
        assert_eq!(&tags[..4], &[&b"IPAD"[..], b"NAME", b"JSON", b"UUID"]);
    }

    #[test]
    fn test_parse_reply_extracts_all_fields() {
        // Arrange
        let datagram = encode_reply(&[
            (TAG_ADDRESS, b"192.168.1.20"),
            (TAG_NAME, b"living-room"),
            (TAG_JSON_PORT, b"9010"),
            (TAG_UUID, b"0b8d7a4c-1f2e"),
        ]);

        // Act
        let reply = parse_reply(&datagram).expect("well-formed reply");

        // Assert
        assert_eq!(reply.control_port, 9010);
        assert_eq!(reply.name.as_deref(), Some("living-room"));
        assert_eq!(reply.uuid.as_deref(), Some("0b8d7a4c-1f2e"));
        assert_eq!(reply.address.as_deref(), Some("192.168.1.20"));
    }

    #[test]
    fn test_parse_reply_defaults_port_when_json_absent() {
        let datagram = encode_reply(&[(TAG_NAME, b"kitchen")]);

        let reply = parse_reply(&datagram).unwrap();

        assert_eq!(reply.control_port, DEFAULT_CONTROL_PORT);
    }

    #[test]
    fn test_parse_reply_skips_unknown_tags() {
        let datagram = encode_reply(&[(*b"VERS", b"8.3.1"), (TAG_JSON_PORT, b"9002")]);

        assert_eq!(parse_reply(&datagram).unwrap().control_port, 9002);
    }

    #[test]
    fn test_parse_reply_accepts_empty_body() {
        assert_eq!(parse_reply(b"E").unwrap().control_port, DEFAULT_CONTROL_PORT);
    }

    #[test]
    fn test_parse_reply_rejects_request_echo() {
        assert_eq!(
            parse_reply(DISCOVERY_REQUEST),
            Err(DiscoveryProtocolError::NotAReply(b'e'))
        );
    }

    #[test]
    fn test_parse_reply_rejects_empty_datagram() {
        assert_eq!(parse_reply(&[]), Err(DiscoveryProtocolError::Empty));
    }

    #[test]
    fn test_parse_reply_rejects_truncated_record() {
        // JSON record claims 10 bytes but carries 4.
        let datagram = b"EJSON\x0a9010";

        let result = parse_reply(datagram);

        assert_eq!(
            result,
            Err(DiscoveryProtocolError::Truncated {
                tag: "JSON".to_string(),
                declared: 10,
                available: 4,
            })
        );
    }

    #[test]
    fn test_parse_reply_rejects_non_numeric_port() {
        let datagram = encode_reply(&[(TAG_JSON_PORT, b"http")]);

        assert!(matches!(
            parse_reply(&datagram),
            Err(DiscoveryProtocolError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_parse_reply_uses_leading_digits_of_port() {
        let datagram = encode_reply(&[(TAG_JSON_PORT, b"9000\0\0")]);

        assert_eq!(parse_reply(&datagram).unwrap().control_port, 9000);
    }

    #[test]
    fn test_records_ignores_trailing_partial_header() {
        let body = b"NAME\x02abJS";

        let parsed: Vec<_> = records(body).collect();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].as_ref().unwrap().text(), "ab");
    }
}
