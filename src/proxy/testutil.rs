//! Frame builders shared by the unit tests.

use super::header::PROXY_V2_SIGNATURE;

/// 16-byte preamble with an explicit length field
pub(crate) fn preamble(ver_cmd: u8, fam_trans: u8, len: u16) -> Vec<u8> {
    let mut buf = PROXY_V2_SIGNATURE.to_vec();
    buf.push(ver_cmd);
    buf.push(fam_trans);
    buf.extend_from_slice(&len.to_be_bytes());
    buf
}

/// Complete header whose length field matches the data appended
pub(crate) fn v2_header(ver_cmd: u8, fam_trans: u8, addresses: &[u8], tlvs: &[u8]) -> Vec<u8> {
    let mut buf = preamble(ver_cmd, fam_trans, (addresses.len() + tlvs.len()) as u16);
    buf.extend_from_slice(addresses);
    buf.extend_from_slice(tlvs);
    buf
}

pub(crate) fn ipv4_block(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16) -> Vec<u8> {
    let mut block = Vec::with_capacity(12);
    block.extend_from_slice(&src);
    block.extend_from_slice(&dst);
    block.extend_from_slice(&src_port.to_be_bytes());
    block.extend_from_slice(&dst_port.to_be_bytes());
    block
}

pub(crate) fn tlv(kind: u8, value: &[u8]) -> Vec<u8> {
    let mut buf = vec![kind];
    buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
    buf.extend_from_slice(value);
    buf
}

/// PP2_TYPE_SSL record: client byte, verify word, then sub-TLVs
pub(crate) fn ssl_tlv(client: u8, verify: u32, subs: &[(u8, &[u8])]) -> Vec<u8> {
    let mut value = vec![client];
    value.extend_from_slice(&verify.to_be_bytes());
    for (kind, sub) in subs {
        value.extend_from_slice(&tlv(*kind, sub));
    }
    tlv(0x20, &value)
}
