//! TLV extension walker
//!
//! Extensions follow the address block as `type (1) | length (2, BE) |
//! value`. A `PP2_TYPE_SSL` value starts with a 5-byte sub-header
//! (`client` flags, `verify` result) followed by its own TLV sequence.
//!
//! Structural errors (truncated record header, zero or overrunning length)
//! are fatal at both levels. An unknown top-level type is only an anomaly:
//! the record is kept and the walk continues. Unknown SSL subtypes are
//! skipped.

use smallvec::SmallVec;

use super::cursor::Cursor;
use super::error::{Anomaly, ProxyError};

pub const PP2_TYPE_ALPN: u8 = 0x01;
pub const PP2_TYPE_AUTHORITY: u8 = 0x02;
pub const PP2_TYPE_SSL: u8 = 0x20;

pub const PP2_SUBTYPE_SSL_VERSION: u8 = 0x21;
pub const PP2_SUBTYPE_SSL_CIPHER: u8 = 0x23;

pub const PP2_CLIENT_SSL: u8 = 0x01;
pub const PP2_CLIENT_CERT_CONN: u8 = 0x02;
pub const PP2_CLIENT_CERT_SESS: u8 = 0x04;

const TLV_HEADER_LEN: usize = 3;
const SSL_HEADER_LEN: usize = 5;

/// Soft anomalies gathered during one parse
pub type Anomalies = SmallVec<[Anomaly; 4]>;

/// Top-level extension type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Alpn,
    Authority,
    Ssl,
    Unknown(u8),
}

impl ExtensionKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            PP2_TYPE_ALPN => ExtensionKind::Alpn,
            PP2_TYPE_AUTHORITY => ExtensionKind::Authority,
            PP2_TYPE_SSL => ExtensionKind::Ssl,
            other => ExtensionKind::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ExtensionKind::Alpn => PP2_TYPE_ALPN,
            ExtensionKind::Authority => PP2_TYPE_AUTHORITY,
            ExtensionKind::Ssl => PP2_TYPE_SSL,
            ExtensionKind::Unknown(code) => code,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExtensionKind::Alpn => "ALPN",
            ExtensionKind::Authority => "Authority",
            ExtensionKind::Ssl => "SSL",
            ExtensionKind::Unknown(_) => "Unknown",
        }
    }
}

/// One top-level TLV record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension<'a> {
    pub kind: ExtensionKind,

    /// Absolute offset of the type byte
    pub offset: usize,

    pub payload: &'a [u8],

    /// Decoded sub-header and sub-TLVs for `PP2_TYPE_SSL`
    pub ssl: Option<SslInfo<'a>>,
}

impl<'a> Extension<'a> {
    pub fn length(&self) -> usize {
        self.payload.len()
    }

    /// Payload as text, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.payload).ok()
    }
}

/// SSL sub-TLV type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslSubKind {
    Version,
    Cipher,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SslSubExtension<'a> {
    pub kind: SslSubKind,
    pub offset: usize,
    pub payload: &'a [u8],
}

/// PP2_TYPE_SSL contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SslInfo<'a> {
    /// PP2_CLIENT_* bit field
    pub client: u8,

    /// Certificate verification result, 0 on success
    pub verify: u32,

    pub sub_extensions: SmallVec<[SslSubExtension<'a>; 2]>,
}

impl<'a> SslInfo<'a> {
    pub fn client_ssl(&self) -> bool {
        self.client & PP2_CLIENT_SSL != 0
    }

    pub fn client_cert_conn(&self) -> bool {
        self.client & PP2_CLIENT_CERT_CONN != 0
    }

    pub fn client_cert_sess(&self) -> bool {
        self.client & PP2_CLIENT_CERT_SESS != 0
    }

    /// TLS version string, e.g. "TLSv1.3"
    pub fn version(&self) -> Option<&'a str> {
        self.sub_str(SslSubKind::Version)
    }

    /// Cipher name, e.g. "ECDHE-RSA-AES128-GCM-SHA256"
    pub fn cipher(&self) -> Option<&'a str> {
        self.sub_str(SslSubKind::Cipher)
    }

    fn sub_str(&self, kind: SslSubKind) -> Option<&'a str> {
        self.sub_extensions
            .iter()
            .find(|sub| sub.kind == kind)
            .and_then(|sub| std::str::from_utf8(sub.payload).ok())
    }
}

struct Record<'a> {
    kind: u8,
    offset: usize,
    payload: &'a [u8],
}

/// Read one `type | length | value` record with bounds checks
fn next_record<'a>(cursor: &mut Cursor<'a>) -> Result<Record<'a>, ProxyError> {
    let offset = cursor.offset();
    let truncated = ProxyError::ExtensionTruncated {
        offset,
        remaining: cursor.remaining(),
    };
    if cursor.remaining() < TLV_HEADER_LEN {
        return Err(truncated);
    }

    let (Some(kind), Some(length)) = (cursor.read_u8(), cursor.read_u16()) else {
        return Err(truncated);
    };
    let length = length as usize;

    let overrun = ProxyError::ExtensionOverrun {
        offset,
        kind,
        length,
    };
    if length == 0 {
        return Err(overrun);
    }
    let payload = cursor.take(length).ok_or(overrun)?;

    Ok(Record {
        kind,
        offset,
        payload,
    })
}

/// Walk the extension region
///
/// `region` holds every received byte after the address block and starts
/// at absolute offset `base`; `expected` is the TLV length declared by the
/// header. A record header must fit inside `expected`. Record values are
/// bounds-checked against `region`, and a record ending past `expected` is
/// a `BufferOverrun` before its value is looked at.
pub fn parse_extensions<'a>(
    region: &'a [u8],
    expected: usize,
    base: usize,
    anomalies: &mut Anomalies,
) -> Result<Vec<Extension<'a>>, ProxyError> {
    let mut cursor = Cursor::new(region, base);
    let mut extensions = Vec::new();

    while cursor.consumed() < expected {
        let left = expected - cursor.consumed();
        if left < TLV_HEADER_LEN {
            return Err(ProxyError::ExtensionTruncated {
                offset: cursor.offset(),
                remaining: left,
            });
        }

        let record = next_record(&mut cursor)?;
        if cursor.consumed() > expected {
            return Err(ProxyError::BufferOverrun {
                consumed: cursor.consumed(),
                expected,
            });
        }

        let kind = ExtensionKind::from_code(record.kind);
        let ssl = match kind {
            ExtensionKind::Ssl => Some(parse_ssl(
                record.payload,
                record.offset + TLV_HEADER_LEN,
                anomalies,
            )?),
            ExtensionKind::Unknown(code) => {
                anomalies.push(Anomaly::UnknownExtension {
                    offset: record.offset,
                    kind: code,
                });
                None
            }
            ExtensionKind::Alpn | ExtensionKind::Authority => None,
        };

        extensions.push(Extension {
            kind,
            offset: record.offset,
            payload: record.payload,
            ssl,
        });
    }

    Ok(extensions)
}

/// Walk a PP2_TYPE_SSL value with its own cursor
fn parse_ssl<'a>(
    value: &'a [u8],
    base: usize,
    anomalies: &mut Anomalies,
) -> Result<SslInfo<'a>, ProxyError> {
    let mut cursor = Cursor::new(value, base);
    let truncated = ProxyError::ExtensionTruncated {
        offset: base,
        remaining: value.len(),
    };
    if value.len() < SSL_HEADER_LEN {
        return Err(truncated);
    }

    let (Some(client), Some(verify)) = (cursor.read_u8(), cursor.read_u32()) else {
        return Err(truncated);
    };

    let mut sub_extensions = SmallVec::new();
    while !cursor.is_empty() {
        let record = next_record(&mut cursor)?;
        let kind = match record.kind {
            PP2_SUBTYPE_SSL_VERSION => SslSubKind::Version,
            PP2_SUBTYPE_SSL_CIPHER => SslSubKind::Cipher,
            other => {
                anomalies.push(Anomaly::UnknownSslSubtype {
                    offset: record.offset,
                    kind: other,
                });
                continue;
            }
        };
        sub_extensions.push(SslSubExtension {
            kind,
            offset: record.offset,
            payload: record.payload,
        });
    }

    Ok(SslInfo {
        client,
        verify,
        sub_extensions,
    })
}
