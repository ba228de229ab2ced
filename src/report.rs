//! Human-readable and JSON rendering of parse results.

use std::fmt;

use serde::Serialize;

use crate::proxy::{
    validate_header, Extension, ExtensionKind, ProxyError, ProxyInfo, SslInfo, FIXED_HEADER_LEN,
};

/// Render a successful parse as tab-separated text lines
pub fn render_text(info: &ProxyInfo<'_>) -> String {
    TextReport(info).to_string()
}

struct TextReport<'r, 'a>(&'r ProxyInfo<'a>);

impl fmt::Display for TextReport<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.0;
        writeln!(f, "PROXY v2 detected.")?;
        writeln!(f, "Connection:\tPROXYed connection detected")?;
        writeln!(f, "Protocol:\t{}", info.header.protocol_name())?;

        if let Some(pair) = info.addresses.pair() {
            writeln!(f, "Source IP:\t{}", pair.source.ip())?;
            writeln!(f, "Destination IP:\t{}", pair.destination.ip())?;
            writeln!(f, "Source port:\t{}", pair.source.port())?;
            writeln!(f, "Destination port:\t{}", pair.destination.port())?;
        }

        for ext in &info.extensions {
            match ext.kind {
                ExtensionKind::Alpn => writeln!(f, "ALPN extension:\t{}", lossy(ext.payload))?,
                ExtensionKind::Authority => {
                    writeln!(f, "Authority extension:\t{}", lossy(ext.payload))?
                }
                ExtensionKind::Ssl => {
                    if let Some(ssl) = &ext.ssl {
                        write_ssl(f, ssl)?;
                    }
                }
                ExtensionKind::Unknown(_) => {}
            }
        }

        for anomaly in &info.anomalies {
            writeln!(f, "WARNING:\t{}", anomaly)?;
        }
        Ok(())
    }
}

fn write_ssl(f: &mut fmt::Formatter<'_>, ssl: &SslInfo<'_>) -> fmt::Result {
    writeln!(f, "SSL client:\t{:#x}", ssl.client)?;
    writeln!(f, "SSL verify:\t{:#x}", ssl.verify)?;
    if let Some(version) = ssl.version() {
        writeln!(f, "SSL version:\t{}", version)?;
    }
    if let Some(cipher) = ssl.cipher() {
        writeln!(f, "SSL cipher:\t{}", cipher)?;
    }
    Ok(())
}

/// Declared extension region of `buf`, for errors raised while walking it
pub fn extensions_data<'b>(err: &ProxyError, buf: &'b [u8]) -> Option<&'b [u8]> {
    if !err.is_extension_error() {
        return None;
    }
    let (header, _) = validate_header(buf).ok()?;
    buf.get(FIXED_HEADER_LEN + header.address_block_len..header.total_len())
}

/// Render a parse failure
///
/// Extension failures get a second line dumping the declared extension
/// region of `buf` as hex bytes.
pub fn render_error(err: &ProxyError, buf: &[u8]) -> String {
    let mut out = format!("ERROR:\t{}", err);
    if let Some(data) = extensions_data(err, buf) {
        out.push_str("\nExtensions data:");
        for byte in data {
            out.push_str(&format!(" {:#x}", byte));
        }
    }
    out
}

/// Whether a parse outcome maps to a successful exit status
///
/// Hard errors fail, as do well-formed headers the tool cannot report
/// (datagram transports, UNIX sockets). Unknown extensions alone do not.
pub fn exit_ok(result: &Result<ProxyInfo<'_>, ProxyError>) -> bool {
    match result {
        Ok(info) => info.is_fully_supported(),
        Err(_) => false,
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[derive(Debug, Serialize)]
struct Report {
    command: &'static str,
    family: &'static str,
    transport: &'static str,
    protocol: &'static str,
    address_block_len: usize,
    extensions_len: usize,
    source: Option<String>,
    destination: Option<String>,
    extensions: Vec<ExtensionReport>,
    anomalies: Vec<String>,
    supported: bool,
}

#[derive(Debug, Serialize)]
struct ExtensionReport {
    kind: &'static str,
    code: u8,
    offset: usize,
    length: usize,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssl: Option<SslReport>,
}

#[derive(Debug, Serialize)]
struct SslReport {
    client: u8,
    verify: u32,
    client_ssl: bool,
    client_cert_conn: bool,
    client_cert_sess: bool,
    version: Option<String>,
    cipher: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorReport<'b> {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'b [u8]>,
}

impl From<&Extension<'_>> for ExtensionReport {
    fn from(ext: &Extension<'_>) -> Self {
        Self {
            kind: ext.kind.as_str(),
            code: ext.kind.code(),
            offset: ext.offset,
            length: ext.length(),
            value: lossy(ext.payload),
            ssl: ext.ssl.as_ref().map(|ssl| SslReport {
                client: ssl.client,
                verify: ssl.verify,
                client_ssl: ssl.client_ssl(),
                client_cert_conn: ssl.client_cert_conn(),
                client_cert_sess: ssl.client_cert_sess(),
                version: ssl.version().map(str::to_string),
                cipher: ssl.cipher().map(str::to_string),
            }),
        }
    }
}

/// Render a successful parse as a JSON object
pub fn render_json(info: &ProxyInfo<'_>) -> Result<String, serde_json::Error> {
    let pair = info.addresses.pair().copied();

    let report = Report {
        command: info.header.command.as_str(),
        family: info.header.family.as_str(),
        transport: info.header.transport.as_str(),
        protocol: info.header.protocol_name(),
        address_block_len: info.header.address_block_len,
        extensions_len: info.header.extensions_len,
        source: pair.map(|p| p.source.to_string()),
        destination: pair.map(|p| p.destination.to_string()),
        extensions: info.extensions.iter().map(ExtensionReport::from).collect(),
        anomalies: info.anomalies.iter().map(ToString::to_string).collect(),
        supported: info.is_fully_supported(),
    };
    serde_json::to_string_pretty(&report)
}

/// Render a parse failure as a JSON object
pub fn render_error_json(err: &ProxyError, buf: &[u8]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ErrorReport {
        error: err.kind(),
        message: err.to_string(),
        data: extensions_data(err, buf),
    })
}
