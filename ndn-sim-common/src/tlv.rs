//! NDN-TLV encoding used to size packets for captures and byte counters.
//!
//! Type and length fields both use the NDN variable-width number format.
//! Decoding is left to the external packet library; the simulator only
//! needs faithful sizes.

use crate::ndn::{Data, Interest, Nack, Name, Packet};
use crate::types::DEFAULT_INTEREST_LIFETIME;
use bytes::{BufMut, Bytes, BytesMut};

/* ---------------------------------------------------------------- *
 * TLV type constants
 * ---------------------------------------------------------------- */

pub const TLV_INTEREST: u32         = 0x05;
pub const TLV_DATA: u32             = 0x06;
pub const TLV_NAME: u32             = 0x07;
pub const TLV_COMPONENT: u32        = 0x08;
pub const TLV_NONCE: u32            = 0x0A;
pub const TLV_INTEREST_LIFETIME: u32 = 0x0C;
pub const TLV_MUST_BE_FRESH: u32    = 0x12;
pub const TLV_META_INFO: u32        = 0x14;
pub const TLV_CONTENT: u32          = 0x15;
pub const TLV_SIGNATURE_INFO: u32   = 0x16;
pub const TLV_SIGNATURE_VALUE: u32  = 0x17;
pub const TLV_FRESHNESS_PERIOD: u32 = 0x19;
pub const TLV_SIGNATURE_TYPE: u32   = 0x1B;
pub const TLV_CAN_BE_PREFIX: u32    = 0x21;
pub const TLV_HOP_LIMIT: u32        = 0x22;
pub const TLV_LP_FRAGMENT: u32      = 0x50;
pub const TLV_LP_PACKET: u32        = 0x64;
pub const TLV_NACK: u32             = 0x0320;
pub const TLV_NACK_REASON: u32      = 0x0321;

/* ---------------------------------------------------------------- *
 * Encoding helpers
 * ---------------------------------------------------------------- */

/// Encode a variable-width number (used for both TLV type and length).
///
/// * `< 253`  → 1 byte
/// * `≤ 65 535`  → marker 253 + 2-byte value
/// * `≤ u32::MAX` → marker 254 + 4-byte value
/// * otherwise → marker 255 + 8-byte value
pub fn encode_var_number(value: u64, buf: &mut BytesMut) {
    if value < 253 {
        buf.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.put_u8(253);
        buf.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        buf.put_u8(254);
        buf.put_u32(value as u32);
    } else {
        buf.put_u8(255);
        buf.put_u64(value);
    }
}

/// Number of bytes required to encode `value` with the variable-width scheme.
pub fn var_number_size(value: u64) -> usize {
    if value < 253 {
        1
    } else if value <= u16::MAX as u64 {
        3
    } else if value <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Encode a non-negative integer in its shortest 1/2/4/8-byte form.
pub fn non_negative_integer(value: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(8);
    if value <= u8::MAX as u64 {
        buf.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        buf.put_u32(value as u32);
    } else {
        buf.put_u64(value);
    }
    buf.freeze()
}

/* ---------------------------------------------------------------- *
 * TLV element wrapper
 * ---------------------------------------------------------------- */

/// A generic TLV element consisting of *type*, *length* and *value*.
#[derive(Debug, Clone, PartialEq)]
pub struct TlvElement {
    pub tlv_type: u32,
    pub value: Bytes,
}

impl TlvElement {
    /// Create a new wrapper from raw parts.
    pub fn new(tlv_type: u32, value: impl Into<Bytes>) -> Self {
        Self {
            tlv_type,
            value: value.into(),
        }
    }

    /// Create an element whose value is the concatenation of `children`.
    pub fn nested(tlv_type: u32, children: &[TlvElement]) -> Self {
        let mut buf = BytesMut::with_capacity(children.iter().map(TlvElement::len).sum());
        for child in children {
            child.encode(&mut buf);
        }
        Self::new(tlv_type, buf.freeze())
    }

    /// Total number of bytes when this element is encoded.
    pub fn len(&self) -> usize {
        let vlen = self.value.len();
        var_number_size(self.tlv_type as u64) + var_number_size(vlen as u64) + vlen
    }

    /// Returns true if the value is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Encode this element into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        encode_var_number(self.tlv_type as u64, buf);
        encode_var_number(self.value.len() as u64, buf);
        buf.extend_from_slice(&self.value);
    }

    /// Encode this element into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

/* ---------------------------------------------------------------- *
 * Packet encoders
 * ---------------------------------------------------------------- */

pub fn encode_name(name: &Name) -> TlvElement {
    let components: Vec<TlvElement> = name
        .components()
        .map(|c| TlvElement::new(TLV_COMPONENT, c.as_bytes().clone()))
        .collect();
    TlvElement::nested(TLV_NAME, &components)
}

pub fn encode_interest(interest: &Interest) -> TlvElement {
    let mut fields = vec![encode_name(&interest.name)];
    if interest.can_be_prefix {
        fields.push(TlvElement::new(TLV_CAN_BE_PREFIX, Bytes::new()));
    }
    if interest.must_be_fresh {
        fields.push(TlvElement::new(TLV_MUST_BE_FRESH, Bytes::new()));
    }
    fields.push(TlvElement::new(
        TLV_NONCE,
        Bytes::copy_from_slice(&interest.nonce.to_be_bytes()),
    ));
    if interest.lifetime != DEFAULT_INTEREST_LIFETIME {
        fields.push(TlvElement::new(
            TLV_INTEREST_LIFETIME,
            non_negative_integer(interest.lifetime.as_millis() as u64),
        ));
    }
    if let Some(hop_limit) = interest.hop_limit {
        fields.push(TlvElement::new(TLV_HOP_LIMIT, Bytes::copy_from_slice(&[hop_limit])));
    }
    TlvElement::nested(TLV_INTEREST, &fields)
}

pub fn encode_data(data: &Data) -> TlvElement {
    let mut fields = vec![encode_name(&data.name)];
    if let Some(freshness) = data.freshness_period {
        let period = TlvElement::new(
            TLV_FRESHNESS_PERIOD,
            non_negative_integer(freshness.as_millis() as u64),
        );
        fields.push(TlvElement::nested(TLV_META_INFO, &[period]));
    }
    fields.push(TlvElement::new(TLV_CONTENT, data.content.clone()));
    // DigestSha256 placeholder; the signature block itself is opaque
    let sig_type = TlvElement::new(TLV_SIGNATURE_TYPE, non_negative_integer(0));
    fields.push(TlvElement::nested(TLV_SIGNATURE_INFO, &[sig_type]));
    fields.push(TlvElement::new(TLV_SIGNATURE_VALUE, data.signature.clone()));
    TlvElement::nested(TLV_DATA, &fields)
}

/// Nacks travel as an NDNLPv2 LpPacket wrapping the refused Interest.
pub fn encode_nack(nack: &Nack) -> TlvElement {
    let reason = TlvElement::new(TLV_NACK_REASON, non_negative_integer(nack.reason.code()));
    let header = TlvElement::nested(TLV_NACK, &[reason]);
    let fragment = TlvElement::new(TLV_LP_FRAGMENT, encode_interest(&nack.interest).to_bytes());
    TlvElement::nested(TLV_LP_PACKET, &[header, fragment])
}

/// Encode any packet to its wire form.
pub fn encode_packet(packet: &Packet) -> Bytes {
    match packet {
        Packet::Interest(interest) => encode_interest(interest).to_bytes(),
        Packet::Data(data) => encode_data(data).to_bytes(),
        Packet::Nack(nack) => encode_nack(nack).to_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_var_number_widths() {
        let mut buf = BytesMut::new();
        encode_var_number(100, &mut buf);
        assert_eq!(&buf[..], &[100]);

        let mut buf = BytesMut::new();
        encode_var_number(0x0320, &mut buf);
        assert_eq!(&buf[..], &[253, 0x03, 0x20]);
        assert_eq!(var_number_size(0x0320), 3);

        let mut buf = BytesMut::new();
        encode_var_number(70_000, &mut buf);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], 254);
    }

    #[test]
    fn test_name_encoding() {
        let wire = encode_name(&Name::from("/a/bc")).to_bytes();
        assert_eq!(&wire[..], &[0x07, 0x07, 0x08, 0x01, b'a', 0x08, 0x02, b'b', b'c']);
    }

    #[test]
    fn test_interest_encoding_includes_selectors() {
        let interest = Interest::new("/a")
            .with_nonce(1)
            .with_can_be_prefix(true)
            .with_must_be_fresh(true);
        let wire = encode_interest(&interest).to_bytes();
        // Interest header + Name(5) + CanBePrefix(2) + MustBeFresh(2) + Nonce(6)
        assert_eq!(wire.len(), 2 + 5 + 2 + 2 + 6);
        assert_eq!(wire[0], TLV_INTEREST as u8);

        let with_lifetime = interest.clone().with_lifetime(Duration::from_millis(1000));
        assert_eq!(encode_interest(&with_lifetime).len(), wire.len() + 4);
    }

    #[test]
    fn test_element_len_matches_encoding() {
        let data = Data::new("/x/y", vec![0u8; 300]).with_freshness(Duration::from_secs(1));
        let element = encode_data(&data);
        assert_eq!(element.len(), element.to_bytes().len());
        assert_eq!(Packet::Data(data).wire_size(), element.len());
    }
}
