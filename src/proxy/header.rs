//! Fixed 16-byte PROXY v2 preamble
//!
//! ```text
//! 0..12  signature  \r\n\r\n\0\r\nQUIT\n
//! 12     version (high nibble) | command (low nibble)
//! 13     family (high nibble)  | transport (low nibble)
//! 14..16 length of address block + extensions, big-endian
//! ```

use super::cursor::Cursor;
use super::error::{Anomaly, ProxyError};

/// PROXY v2 signature (12 bytes)
pub const PROXY_V2_SIGNATURE: &[u8; 12] = b"\r\n\r\n\x00\r\nQUIT\n";

/// PROXY v1 prefix for TCP headers: recognized, never parsed
pub const PROXY_V1_PREFIX: &[u8; 9] = b"PROXY TCP";

/// Size of the fixed preamble preceding the address block
pub const FIXED_HEADER_LEN: usize = 16;

/// Maximum PROXY header size accepted from a single read
pub const MAX_HEADER_SIZE: usize = 536;

const PROXY_V2_VERSION: u8 = 0x2;

/// Connection command (low nibble of byte 12)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Local,
    Proxy,
}

impl Command {
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0x0 => Some(Command::Local),
            0x1 => Some(Command::Proxy),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Local => "LOCAL",
            Command::Proxy => "PROXY",
        }
    }
}

/// Address family (high nibble of byte 13)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Unspec,
    Inet,
    Inet6,
    Unix,
}

impl AddressFamily {
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0x0 => Some(AddressFamily::Unspec),
            0x1 => Some(AddressFamily::Inet),
            0x2 => Some(AddressFamily::Inet6),
            0x3 => Some(AddressFamily::Unix),
            _ => None,
        }
    }

    /// Fixed size of the address block for this family
    pub fn address_block_len(self) -> usize {
        match self {
            AddressFamily::Unspec => 0,
            AddressFamily::Inet => 12,
            AddressFamily::Inet6 => 36,
            AddressFamily::Unix => 216,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AddressFamily::Unspec => "UNSPEC",
            AddressFamily::Inet => "INET",
            AddressFamily::Inet6 => "INET6",
            AddressFamily::Unix => "UNIX",
        }
    }
}

/// Transport protocol (low nibble of byte 13)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Unspec,
    Stream,
    Datagram,
}

impl Transport {
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0x0 => Some(Transport::Unspec),
            0x1 => Some(Transport::Stream),
            0x2 => Some(Transport::Datagram),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Unspec => "UNSPEC",
            Transport::Stream => "STREAM",
            Transport::Datagram => "DGRAM",
        }
    }
}

/// Human-readable protocol name, e.g. "TCP over IPv4"
pub fn protocol_name(family: AddressFamily, transport: Transport) -> &'static str {
    match (family, transport) {
        (AddressFamily::Inet, Transport::Stream) => "TCP over IPv4",
        (AddressFamily::Inet, Transport::Datagram) => "UDP over IPv4",
        (AddressFamily::Inet6, Transport::Stream) => "TCP over IPv6",
        (AddressFamily::Inet6, Transport::Datagram) => "UDP over IPv6",
        (AddressFamily::Unix, Transport::Stream) => "UNIX stream",
        (AddressFamily::Unix, Transport::Datagram) => "UNIX datagram",
        _ => "unspecified",
    }
}

/// Validated fields of the fixed preamble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedHeader {
    pub command: Command,
    pub family: AddressFamily,
    pub transport: Transport,

    /// Bytes of address data following the preamble (12, 36 or 216)
    pub address_block_len: usize,

    /// Bytes of TLV data following the address block
    pub extensions_len: usize,
}

impl ParsedHeader {
    /// Full header size: preamble, address block and extensions
    pub fn total_len(&self) -> usize {
        FIXED_HEADER_LEN + self.address_block_len + self.extensions_len
    }

    pub fn protocol_name(&self) -> &'static str {
        protocol_name(self.family, self.transport)
    }
}

/// Validate the 16-byte preamble against the received buffer
///
/// Checks run in wire order and the first failure is returned. Datagram
/// transports are well-formed, so they come back as a soft warning rather
/// than an error.
pub fn validate_header(buf: &[u8]) -> Result<(ParsedHeader, Option<Anomaly>), ProxyError> {
    if buf.len() < FIXED_HEADER_LEN {
        return Err(ProxyError::ShortRead {
            expected: FIXED_HEADER_LEN,
            actual: buf.len(),
        });
    }

    if buf.starts_with(PROXY_V1_PREFIX) {
        return Err(ProxyError::LegacyFormatUnsupported);
    }

    let mut cursor = Cursor::new(buf, 0);
    let short = || ProxyError::ShortRead {
        expected: FIXED_HEADER_LEN,
        actual: buf.len(),
    };

    let signature: [u8; 12] = cursor.read_array().ok_or_else(short)?;
    if signature != *PROXY_V2_SIGNATURE {
        return Err(ProxyError::InvalidSignature);
    }

    let ver_cmd = cursor.read_u8().ok_or_else(short)?;
    if ver_cmd >> 4 != PROXY_V2_VERSION {
        return Err(ProxyError::InvalidVersion { byte: ver_cmd });
    }
    let command = match Command::from_nibble(ver_cmd & 0x0F) {
        Some(Command::Proxy) => Command::Proxy,
        _ => return Err(ProxyError::InvalidCommand { byte: ver_cmd }),
    };

    let fam_trans = cursor.read_u8().ok_or_else(short)?;
    let (family, transport) = decode_family_transport(fam_trans)
        .ok_or(ProxyError::InvalidFamilyTransport { byte: fam_trans })?;
    let address_block_len = family.address_block_len();

    let declared = cursor.read_u16().ok_or_else(short)? as usize;
    if declared < address_block_len {
        return Err(ProxyError::LengthMismatch {
            declared,
            address_block_len,
        });
    }
    if declared + FIXED_HEADER_LEN > buf.len() {
        return Err(ProxyError::ShortRead {
            expected: declared + FIXED_HEADER_LEN,
            actual: buf.len(),
        });
    }

    let header = ParsedHeader {
        command,
        family,
        transport,
        address_block_len,
        extensions_len: declared - address_block_len,
    };

    let warning = (transport == Transport::Datagram)
        .then_some(Anomaly::UnsupportedTransport { family, transport });

    Ok((header, warning))
}

/// Decode byte 13, accepting only INET/INET6/UNIX over STREAM/DGRAM
fn decode_family_transport(byte: u8) -> Option<(AddressFamily, Transport)> {
    let family = AddressFamily::from_nibble(byte >> 4)?;
    let transport = Transport::from_nibble(byte & 0x0F)?;

    if family == AddressFamily::Unspec || transport == Transport::Unspec {
        return None;
    }
    Some((family, transport))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::testutil::{preamble, v2_header};
    use test_case::test_case;

    #[test]
    fn test_proxy_v2_signature() {
        assert_eq!(PROXY_V2_SIGNATURE.len(), 12);
        assert_eq!(PROXY_V1_PREFIX.len(), 9);
    }

    #[test]
    fn test_short_buffer() {
        let buf = preamble(0x21, 0x11, 12);
        assert_eq!(
            validate_header(&buf[..15]),
            Err(ProxyError::ShortRead {
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn test_legacy_prefix_wins_over_signature() {
        let buf = b"PROXY TCP4 192.168.1.1 10.0.0.1 12345 80\r\n";
        assert_eq!(validate_header(buf), Err(ProxyError::LegacyFormatUnsupported));
    }

    #[test]
    fn test_legacy_unknown_is_just_bad_signature() {
        let buf = b"PROXY UNKNOWN   \r\n";
        assert_eq!(validate_header(buf), Err(ProxyError::InvalidSignature));
    }

    #[test]
    fn test_invalid_signature() {
        let mut buf = v2_header(0x21, 0x11, &[0u8; 12], &[]);
        buf[7] = b'X';
        assert_eq!(validate_header(&buf), Err(ProxyError::InvalidSignature));
    }

    #[test_case(0x11 ; "version one")]
    #[test_case(0x31 ; "version three")]
    #[test_case(0x01 ; "version zero")]
    fn test_invalid_version(ver_cmd: u8) {
        let buf = v2_header(ver_cmd, 0x11, &[0u8; 12], &[]);
        assert_eq!(
            validate_header(&buf),
            Err(ProxyError::InvalidVersion { byte: ver_cmd })
        );
    }

    #[test]
    fn test_local_command_rejected() {
        let buf = v2_header(0x20, 0x11, &[0u8; 12], &[]);
        let err = validate_header(&buf).unwrap_err();
        assert_eq!(err, ProxyError::InvalidCommand { byte: 0x20 });
        assert!(err.is_local());
    }

    #[test]
    fn test_unknown_command_rejected() {
        let buf = v2_header(0x22, 0x11, &[0u8; 12], &[]);
        let err = validate_header(&buf).unwrap_err();
        assert_eq!(err, ProxyError::InvalidCommand { byte: 0x22 });
        assert!(!err.is_local());
    }

    #[test_case(0x11, AddressFamily::Inet, Transport::Stream, 12)]
    #[test_case(0x12, AddressFamily::Inet, Transport::Datagram, 12)]
    #[test_case(0x21, AddressFamily::Inet6, Transport::Stream, 36)]
    #[test_case(0x22, AddressFamily::Inet6, Transport::Datagram, 36)]
    #[test_case(0x31, AddressFamily::Unix, Transport::Stream, 216)]
    #[test_case(0x32, AddressFamily::Unix, Transport::Datagram, 216)]
    fn test_supported_family_transport(
        byte: u8,
        family: AddressFamily,
        transport: Transport,
        block_len: usize,
    ) {
        let buf = v2_header(0x21, byte, &vec![0u8; block_len], &[]);
        let (header, warning) = validate_header(&buf).unwrap();

        assert_eq!(header.command, Command::Proxy);
        assert_eq!(header.family, family);
        assert_eq!(header.transport, transport);
        assert_eq!(header.address_block_len, block_len);
        assert_eq!(header.extensions_len, 0);
        assert_eq!(header.total_len(), buf.len());
        assert_eq!(warning.is_some(), transport == Transport::Datagram);
    }

    #[test_case(0x00 ; "unspec unspec")]
    #[test_case(0x10 ; "inet unspec")]
    #[test_case(0x01 ; "unspec stream")]
    #[test_case(0x13 ; "inet bad transport")]
    #[test_case(0x41 ; "bad family stream")]
    #[test_case(0xFF ; "all bits")]
    fn test_unsupported_family_transport(byte: u8) {
        let buf = v2_header(0x21, byte, &[0u8; 12], &[]);
        assert_eq!(
            validate_header(&buf),
            Err(ProxyError::InvalidFamilyTransport { byte })
        );
    }

    #[test_case(0x11, 12)]
    #[test_case(0x21, 36)]
    #[test_case(0x31, 216)]
    fn test_length_below_address_block(byte: u8, block_len: usize) {
        let mut buf = preamble(0x21, byte, (block_len - 1) as u16);
        buf.resize(16 + block_len, 0);
        assert_eq!(
            validate_header(&buf),
            Err(ProxyError::LengthMismatch {
                declared: block_len - 1,
                address_block_len: block_len
            })
        );
    }

    #[test]
    fn test_declared_length_exceeds_received() {
        let mut buf = v2_header(0x21, 0x11, &[0u8; 12], &[0x01, 0x00, 0x02, b'h', b'2']);
        buf.truncate(buf.len() - 1);
        assert_eq!(
            validate_header(&buf),
            Err(ProxyError::ShortRead {
                expected: 33,
                actual: 32
            })
        );
    }

    #[test]
    fn test_extensions_len_excludes_address_block() {
        let buf = v2_header(0x21, 0x21, &[0u8; 36], &[0x01, 0x00, 0x02, b'h', b'2']);
        let (header, _) = validate_header(&buf).unwrap();
        assert_eq!(header.address_block_len, 36);
        assert_eq!(header.extensions_len, 5);
    }

    #[test]
    fn test_protocol_names() {
        assert_eq!(
            protocol_name(AddressFamily::Inet6, Transport::Datagram),
            "UDP over IPv6"
        );
        assert_eq!(protocol_name(AddressFamily::Unix, Transport::Stream), "UNIX stream");
    }
}
