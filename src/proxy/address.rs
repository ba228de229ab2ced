//! Address block decoding for INET and INET6 layouts.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use super::cursor::Cursor;
use super::error::ProxyError;
use super::header::{AddressFamily, FIXED_HEADER_LEN};

/// Original client and proxy endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPair {
    /// Address of the actual client
    pub source: SocketAddr,

    /// Address the client connected to
    pub destination: SocketAddr,
}

/// Decoded address block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addresses {
    Inet(AddressPair),
    Inet6(AddressPair),
    /// UNIX socket paths: the 216 bytes are skipped, not decoded
    Unix,
    Unspecified,
}

impl Addresses {
    pub fn pair(&self) -> Option<&AddressPair> {
        match self {
            Addresses::Inet(pair) | Addresses::Inet6(pair) => Some(pair),
            Addresses::Unix | Addresses::Unspecified => None,
        }
    }
}

/// Decode the address block that starts right after the preamble
pub fn decode_addresses(family: AddressFamily, block: &[u8]) -> Result<Addresses, ProxyError> {
    let needed = family.address_block_len();
    let mut cursor = Cursor::new(block, FIXED_HEADER_LEN);
    let short = || ProxyError::ShortRead {
        expected: FIXED_HEADER_LEN + needed,
        actual: FIXED_HEADER_LEN + block.len(),
    };

    match family {
        AddressFamily::Inet => {
            let src = Ipv4Addr::from(cursor.read_array::<4>().ok_or_else(short)?);
            let dst = Ipv4Addr::from(cursor.read_array::<4>().ok_or_else(short)?);
            let pair = read_ports(&mut cursor, src.into(), dst.into()).ok_or_else(short)?;
            Ok(Addresses::Inet(pair))
        }
        AddressFamily::Inet6 => {
            let src = Ipv6Addr::from(cursor.read_array::<16>().ok_or_else(short)?);
            let dst = Ipv6Addr::from(cursor.read_array::<16>().ok_or_else(short)?);
            let pair = read_ports(&mut cursor, src.into(), dst.into()).ok_or_else(short)?;
            Ok(Addresses::Inet6(pair))
        }
        AddressFamily::Unix => {
            cursor.take(needed).ok_or_else(short)?;
            Ok(Addresses::Unix)
        }
        AddressFamily::Unspec => Ok(Addresses::Unspecified),
    }
}

fn read_ports(cursor: &mut Cursor<'_>, src: IpAddr, dst: IpAddr) -> Option<AddressPair> {
    let src_port = cursor.read_u16()?;
    let dst_port = cursor.read_u16()?;
    Some(AddressPair {
        source: SocketAddr::new(src, src_port),
        destination: SocketAddr::new(dst, dst_port),
    })
}
