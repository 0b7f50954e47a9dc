//! Names and the three network-layer packets: Interest, Data and Nack.
//!
//! Packets are plain values. Forwarders copy them in transit and only ever
//! touch the HopLimit of a forwarded Interest.

use crate::error::Error;
use crate::tlv;
use crate::types::{PacketKind, DEFAULT_INTEREST_LIFETIME};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One opaque name segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameComponent(pub Bytes);

impl NameComponent {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    /// Parses one URI-encoded component, decoding `%XX` escapes.
    fn from_uri(s: &str) -> Result<Self, Error> {
        let raw = s.as_bytes();
        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'%' {
                let hex = s
                    .get(i + 1..i + 3)
                    .ok_or_else(|| Error::Other(format!("truncated escape in component {:?}", s)))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|_| Error::Other(format!("bad escape %{} in component {:?}", hex, s)))?;
                out.push(byte);
                i += 3;
            } else {
                out.push(raw[i]);
                i += 1;
            }
        }
        Ok(Self(Bytes::from(out)))
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Unreserved URI characters are printed as-is, everything else is escaped
        for &b in self.0.iter() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "%{:02X}", b)?;
            }
        }
        Ok(())
    }
}

/// Hierarchical NDN name such as `/video/seg/3`.
///
/// Names order component-wise, so every name sorts directly before all of
/// the names it is a prefix of.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    /// The root name `/`.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Lenient URI parse.
    ///
    /// Malformed escapes are kept verbatim; use [`str::parse`] to reject them.
    pub fn from_string(s: &str) -> Self {
        let components = s
            .split('/')
            .filter(|comp| !comp.is_empty())
            .map(|comp| {
                NameComponent::from_uri(comp)
                    .unwrap_or_else(|_| NameComponent::new(comp.as_bytes().to_vec()))
            })
            .collect();

        Self { components }
    }

    pub fn push(&mut self, component: NameComponent) -> &mut Self {
        self.components.push(component);
        self
    }

    /// Returns a copy of this name with one more component.
    pub fn append(&self, component: impl Into<Bytes>) -> Self {
        let mut name = self.clone();
        name.push(NameComponent::new(component));
        name
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &NameComponent> {
        self.components.iter()
    }

    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    /// First `len` components (the whole name if it is shorter).
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    /// True when every component of `self` starts `other`; a name is a prefix of itself.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.len() <= other.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }

        for component in &self.components {
            write!(f, "/{}", component)?;
        }

        Ok(())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = s
            .split('/')
            .filter(|comp| !comp.is_empty())
            .map(NameComponent::from_uri)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::new()
    }
}

/// Request for named content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub name: Name,

    /// Random value used for loop detection
    pub nonce: u32,

    /// How long forwarders keep the Interest pending.
    pub lifetime: Duration,

    /// Remaining number of forwarder hops (similar to IP TTL).
    pub hop_limit: Option<u8>,

    /// Whether a Data with a longer name may satisfy this Interest.
    pub can_be_prefix: bool,

    /// Whether cached Data must still be fresh to satisfy this Interest.
    pub must_be_fresh: bool,
}

impl Interest {
    /// Creates a new Interest packet with a random nonce.
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            nonce: rand::random(),
            lifetime: DEFAULT_INTEREST_LIFETIME,
            hop_limit: None,
            can_be_prefix: false,
            must_be_fresh: false,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = Some(hop_limit);
        self
    }

    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }

    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }

    /// Returns the requested name.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns true if two Interests may share one PIT entry.
    pub fn same_selectors(&self, other: &Interest) -> bool {
        self.name == other.name
            && self.can_be_prefix == other.can_be_prefix
            && self.must_be_fresh == other.must_be_fresh
    }

    /// Checks whether `data` answers this Interest by name.
    ///
    /// Freshness is not considered here; it only matters for cached Data.
    pub fn matches_data(&self, data: &Data) -> bool {
        if self.can_be_prefix {
            self.name.is_prefix_of(&data.name)
        } else {
            self.name == data.name
        }
    }
}

/// Named, immutable content answering an Interest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub name: Name,
    pub content: Bytes,

    /// How long after arrival a cached copy counts as fresh.
    /// `None` means the Data is stale as soon as it is cached.
    pub freshness_period: Option<Duration>,

    /// Opaque signature block; never interpreted by the forwarder.
    pub signature: Bytes,
}

impl Data {
    pub fn new(name: impl Into<Name>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            freshness_period: None,
            signature: Bytes::new(),
        }
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness_period = Some(freshness);
        self
    }

    /// Attaches an opaque signature block.
    pub fn with_signature(mut self, signature: impl Into<Bytes>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Returns the Data name.
    pub fn name(&self) -> &Name {
        &self.name
    }
}

/// Reason carried by a Nack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NackReason {
    Unspecified,
    Congestion,
    Duplicate,
    NoRoute,
}

impl NackReason {
    /// NDNLPv2 reason code.
    pub fn code(&self) -> u64 {
        match self {
            NackReason::Unspecified => 0,
            NackReason::Congestion => 50,
            NackReason::Duplicate => 100,
            NackReason::NoRoute => 150,
        }
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NackReason::Unspecified => write!(f, "unspecified"),
            NackReason::Congestion => write!(f, "congestion"),
            NackReason::Duplicate => write!(f, "duplicate"),
            NackReason::NoRoute => write!(f, "no-route"),
        }
    }
}

/// A negative acknowledgement for one Interest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nack {
    pub reason: NackReason,
    /// The Interest being refused, including the nonce it carried.
    pub interest: Interest,
}

impl Nack {
    pub fn new(interest: Interest, reason: NackReason) -> Self {
        Self { reason, interest }
    }

    pub fn name(&self) -> &Name {
        &self.interest.name
    }
}

/// Any packet that can travel over a face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Interest(Interest),
    Data(Data),
    Nack(Nack),
}

impl Packet {
    /// Get the name of the packet
    pub fn name(&self) -> &Name {
        match self {
            Packet::Interest(interest) => &interest.name,
            Packet::Data(data) => &data.name,
            Packet::Nack(nack) => nack.name(),
        }
    }

    /// Get the type of the packet
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Interest(_) => PacketKind::Interest,
            Packet::Data(_) => PacketKind::Data,
            Packet::Nack(_) => PacketKind::Nack,
        }
    }

    /// Returns the NDN-TLV encoded size of this packet.
    pub fn wire_size(&self) -> usize {
        tlv::encode_packet(self).len()
    }
}

impl From<Interest> for Packet {
    fn from(interest: Interest) -> Self {
        Packet::Interest(interest)
    }
}

impl From<Data> for Packet {
    fn from(data: Data) -> Self {
        Packet::Data(data)
    }
}

impl From<Nack> for Packet {
    fn from(nack: Nack) -> Self {
        Packet::Nack(nack)
    }
}

#[cfg(test)]
mod tests;
