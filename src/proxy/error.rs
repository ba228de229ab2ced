//! Hard parse failures and soft anomalies.

use super::header::{protocol_name, AddressFamily, Transport};

/// Errors that stop PROXY v2 header parsing
///
/// Every variant carries enough context (offending byte, offset or counts)
/// to explain the failure without the original buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// Fewer bytes received than the header requires
    ShortRead { expected: usize, actual: usize },
    /// Buffer starts with the v1 text prefix
    LegacyFormatUnsupported,
    /// First 12 bytes are not the v2 signature
    InvalidSignature,
    /// High nibble of byte 12 is not 2
    InvalidVersion { byte: u8 },
    /// Low nibble of byte 12 is LOCAL or unassigned
    InvalidCommand { byte: u8 },
    /// Byte 13 is not one of the six supported family/transport pairs
    InvalidFamilyTransport { byte: u8 },
    /// Declared length leaves no room for the address block
    LengthMismatch {
        declared: usize,
        address_block_len: usize,
    },
    /// Fewer than a full TLV header left in the region
    ExtensionTruncated { offset: usize, remaining: usize },
    /// TLV length is zero or runs past the end of its region
    ExtensionOverrun { offset: usize, kind: u8, length: usize },
    /// Extension walk did not end exactly at the declared length
    BufferOverrun { consumed: usize, expected: usize },
}

impl ProxyError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::ShortRead { .. } => "short_read",
            ProxyError::LegacyFormatUnsupported => "legacy_format_unsupported",
            ProxyError::InvalidSignature => "invalid_signature",
            ProxyError::InvalidVersion { .. } => "invalid_version",
            ProxyError::InvalidCommand { .. } => "invalid_command",
            ProxyError::InvalidFamilyTransport { .. } => "invalid_family_transport",
            ProxyError::LengthMismatch { .. } => "length_mismatch",
            ProxyError::ExtensionTruncated { .. } => "extension_truncated",
            ProxyError::ExtensionOverrun { .. } => "extension_overrun",
            ProxyError::BufferOverrun { .. } => "buffer_overrun",
        }
    }

    /// True for failures inside the TLV extension region
    pub fn is_extension_error(&self) -> bool {
        matches!(
            self,
            ProxyError::ExtensionTruncated { .. }
                | ProxyError::ExtensionOverrun { .. }
                | ProxyError::BufferOverrun { .. }
        )
    }

    /// True for the LOCAL command, which is well-formed but carries no
    /// forwarded connection data.
    pub fn is_local(&self) -> bool {
        matches!(self, ProxyError::InvalidCommand { byte } if byte & 0x0F == 0x0)
    }
}

impl std::fmt::Display for ProxyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyError::ShortRead { expected, actual } => {
                write!(f, "too few bytes read: need {}, got {}", expected, actual)
            }
            ProxyError::LegacyFormatUnsupported => {
                write!(f, "PROXY v1 text header is not supported")
            }
            ProxyError::InvalidSignature => write!(f, "not a valid PROXY v2 header"),
            ProxyError::InvalidVersion { byte } => {
                write!(f, "13th byte has illegal version {:#04x}", byte)
            }
            ProxyError::InvalidCommand { .. } if self.is_local() => {
                write!(f, "LOCAL connection carries no forwarded addresses")
            }
            ProxyError::InvalidCommand { byte } => {
                write!(f, "13th byte has illegal command {:#04x}", byte)
            }
            ProxyError::InvalidFamilyTransport { byte } => {
                write!(f, "14th byte has unsupported family/transport {:#04x}", byte)
            }
            ProxyError::LengthMismatch {
                declared,
                address_block_len,
            } => write!(
                f,
                "declared length {} does not leave room for {} address bytes",
                declared, address_block_len
            ),
            ProxyError::ExtensionTruncated { offset, remaining } => write!(
                f,
                "extension truncated at offset {}: {} bytes left",
                offset, remaining
            ),
            ProxyError::ExtensionOverrun {
                offset,
                kind,
                length,
            } => write!(
                f,
                "extension {:#04x} at offset {} has invalid length {}",
                kind, offset, length
            ),
            ProxyError::BufferOverrun { consumed, expected } => {
                write!(f, "buffer overrun ({} / {})", consumed, expected)
            }
        }
    }
}

impl std::error::Error for ProxyError {}

/// Non-fatal findings collected alongside a successful parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Datagram transport: well-formed, but not served by this tool
    UnsupportedTransport {
        family: AddressFamily,
        transport: Transport,
    },
    /// UNIX socket paths are skipped, not decoded
    UnixAddressNotDisplayable,
    /// Top-level TLV with a type code outside ALPN/Authority/SSL
    UnknownExtension { offset: usize, kind: u8 },
    /// SSL sub-TLV other than version or cipher
    UnknownSslSubtype { offset: usize, kind: u8 },
}

impl Anomaly {
    /// Anomalies that make the result unusable for the surrounding system
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Anomaly::UnsupportedTransport { .. } | Anomaly::UnixAddressNotDisplayable
        )
    }
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::UnsupportedTransport { family, transport } => {
                write!(f, "protocol {} unsupported", protocol_name(*family, *transport))
            }
            Anomaly::UnixAddressNotDisplayable => {
                write!(f, "printing of UNIX socket addresses not implemented")
            }
            Anomaly::UnknownExtension { offset, kind } => {
                write!(f, "unknown extension {:#04x} at offset {}", kind, offset)
            }
            Anomaly::UnknownSslSubtype { offset, kind } => {
                write!(f, "unknown SSL subtype {:#04x} at offset {}", kind, offset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_command_message() {
        let err = ProxyError::InvalidCommand { byte: 0x20 };
        assert!(err.is_local());
        assert!(err.to_string().contains("LOCAL"));

        let err = ProxyError::InvalidCommand { byte: 0x2F };
        assert!(!err.is_local());
        assert!(err.to_string().contains("0x2f"));
    }

    #[test]
    fn test_buffer_overrun_reports_counts() {
        let err = ProxyError::BufferOverrun {
            consumed: 14,
            expected: 13,
        };
        assert_eq!(err.to_string(), "buffer overrun (14 / 13)");
        assert_eq!(err.kind(), "buffer_overrun");
    }

    #[test]
    fn test_extension_errors() {
        assert!(ProxyError::ExtensionTruncated { offset: 28, remaining: 2 }.is_extension_error());
        assert!(ProxyError::BufferOverrun { consumed: 14, expected: 13 }.is_extension_error());
        assert!(!ProxyError::InvalidSignature.is_extension_error());
    }

    #[test]
    fn test_unsupported_anomalies() {
        assert!(Anomaly::UnixAddressNotDisplayable.is_unsupported());
        assert!(!Anomaly::UnknownExtension { offset: 28, kind: 4 }.is_unsupported());
    }
}
