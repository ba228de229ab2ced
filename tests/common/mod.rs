//! Shared frame builders for integration tests

#![allow(dead_code)]

use proxy_v2_inspect::proxy::PROXY_V2_SIGNATURE;

/// Family/transport bytes accepted by the parser, with their address block size
pub const SUPPORTED_FAMILIES: [(u8, usize); 6] = [
    (0x11, 12),
    (0x12, 12),
    (0x21, 36),
    (0x22, 36),
    (0x31, 216),
    (0x32, 216),
];

pub fn preamble(ver_cmd: u8, fam_trans: u8, len: u16) -> Vec<u8> {
    let mut buf = PROXY_V2_SIGNATURE.to_vec();
    buf.push(ver_cmd);
    buf.push(fam_trans);
    buf.extend_from_slice(&len.to_be_bytes());
    buf
}

pub fn v2_header(fam_trans: u8, addresses: &[u8], tlvs: &[u8]) -> Vec<u8> {
    let mut buf = preamble(0x21, fam_trans, (addresses.len() + tlvs.len()) as u16);
    buf.extend_from_slice(addresses);
    buf.extend_from_slice(tlvs);
    buf
}

pub fn tlv(kind: u8, value: &[u8]) -> Vec<u8> {
    let mut buf = vec![kind];
    buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
    buf.extend_from_slice(value);
    buf
}

pub fn ssl_tlv(client: u8, verify: u32, subs: &[(u8, &[u8])]) -> Vec<u8> {
    let mut value = vec![client];
    value.extend_from_slice(&verify.to_be_bytes());
    for (kind, sub) in subs {
        value.extend_from_slice(&tlv(*kind, sub));
    }
    tlv(0x20, &value)
}
