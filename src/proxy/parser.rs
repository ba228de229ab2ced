//! PROXY Protocol v2 Parser
//!
//! Validates the preamble, decodes the address block and walks the TLV
//! extensions of a single, fully received header.

use std::net::SocketAddr;

use tracing::debug;

use super::address::{decode_addresses, Addresses};
use super::error::{Anomaly, ProxyError};
use super::header::{validate_header, ParsedHeader, FIXED_HEADER_LEN};
use super::tlv::{parse_extensions, Anomalies, Extension, ExtensionKind, SslInfo};

/// Information extracted from a PROXY v2 header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyInfo<'a> {
    /// Validated preamble fields
    pub header: ParsedHeader,

    /// Original client and server addresses
    pub addresses: Addresses,

    /// TLV records in wire order
    pub extensions: Vec<Extension<'a>>,

    /// Non-fatal findings, in the order they were met
    pub anomalies: Anomalies,
}

impl<'a> ProxyInfo<'a> {
    /// Original client address (source from PROXY header)
    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.addresses.pair().map(|pair| pair.source)
    }

    /// Server address the client connected to (destination from PROXY header)
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.addresses.pair().map(|pair| pair.destination)
    }

    /// PP2_TYPE_ALPN payload
    pub fn alpn(&self) -> Option<&'a [u8]> {
        self.find(ExtensionKind::Alpn).map(|ext| ext.payload)
    }

    /// PP2_TYPE_AUTHORITY payload (usually the SNI host name)
    pub fn authority(&self) -> Option<&'a [u8]> {
        self.find(ExtensionKind::Authority).map(|ext| ext.payload)
    }

    pub fn ssl(&self) -> Option<&SslInfo<'a>> {
        self.find(ExtensionKind::Ssl).and_then(|ext| ext.ssl.as_ref())
    }

    /// False when the header is well-formed but describes a connection the
    /// tool cannot report (datagram transports, UNIX sockets).
    pub fn is_fully_supported(&self) -> bool {
        !self.anomalies.iter().any(Anomaly::is_unsupported)
    }

    fn find(&self, kind: ExtensionKind) -> Option<&Extension<'a>> {
        self.extensions.iter().find(|ext| ext.kind == kind)
    }
}

/// Parse a PROXY v2 header from a received buffer
///
/// The buffer must hold the whole header; bytes after it (the proxied
/// stream) are ignored. Stops at the first hard error. Identical input
/// always yields an identical result.
pub fn parse_proxy_v2(buf: &[u8]) -> Result<ProxyInfo<'_>, ProxyError> {
    let (header, warning) = validate_header(buf)?;
    let mut anomalies = Anomalies::new();
    anomalies.extend(warning);

    let block_end = FIXED_HEADER_LEN + header.address_block_len;
    let short = || ProxyError::ShortRead {
        expected: header.total_len(),
        actual: buf.len(),
    };

    let block = buf.get(FIXED_HEADER_LEN..block_end).ok_or_else(short)?;
    let addresses = decode_addresses(header.family, block)?;
    if addresses == Addresses::Unix {
        anomalies.push(Anomaly::UnixAddressNotDisplayable);
    }

    let extensions = if header.extensions_len > 0 {
        let region = buf.get(block_end..).ok_or_else(short)?;
        parse_extensions(region, header.extensions_len, block_end, &mut anomalies)?
    } else {
        Vec::new()
    };

    for anomaly in &anomalies {
        debug!(%anomaly, "PROXY v2 anomaly");
    }

    Ok(ProxyInfo {
        header,
        addresses,
        extensions,
        anomalies,
    })
}
