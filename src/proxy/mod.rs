//! PROXY Protocol Module
//!
//! Decodes HAProxy PROXY protocol v2 headers: preamble validation, address
//! extraction and the TLV extension walk, including the nested SSL
//! sub-TLVs. The v1 text format is recognized and rejected.

mod address;
mod cursor;
mod error;
mod header;
mod parser;
mod tlv;

#[cfg(test)]
pub(crate) mod testutil;

pub use address::{decode_addresses, AddressPair, Addresses};
pub use error::{Anomaly, ProxyError};
pub use header::{
    protocol_name, validate_header, AddressFamily, Command, ParsedHeader, Transport,
    FIXED_HEADER_LEN, MAX_HEADER_SIZE, PROXY_V1_PREFIX, PROXY_V2_SIGNATURE,
};
pub use parser::{parse_proxy_v2, ProxyInfo};
pub use tlv::{
    parse_extensions, Anomalies, Extension, ExtensionKind, SslInfo, SslSubExtension, SslSubKind,
    PP2_CLIENT_CERT_CONN, PP2_CLIENT_CERT_SESS, PP2_CLIENT_SSL, PP2_SUBTYPE_SSL_CIPHER,
    PP2_SUBTYPE_SSL_VERSION, PP2_TYPE_ALPN, PP2_TYPE_AUTHORITY, PP2_TYPE_SSL,
};
