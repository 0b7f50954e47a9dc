//! Identifiers and defaults shared between the forwarder and the topology layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default number of entries kept by a Content Store.
pub const DEFAULT_CS_CAPACITY: usize = 100;

/// Default time a (name, nonce) pair stays in the Dead Nonce List.
pub const DEFAULT_DNL_RETENTION: Duration = Duration::from_secs(6);

/// Default period of the PIT expiry sweep.
pub const DEFAULT_PIT_SWEEP_INTERVAL: Duration = Duration::from_millis(50);

/// Default Interest lifetime.
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_millis(4000);

/// Default capacity of the observer broadcast channel.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Identifies a face on one forwarder. Face ids are never reused by a forwarder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(pub u32);

impl FaceId {
    /// The in-process application face used by `express_interest`.
    pub const APP: FaceId = FaceId(0);
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FaceId({})", self.0)
    }
}

/// Identifies a simulated connection within a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Face type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceKind {
    /// Local consumer face used by `express_interest`.
    App,
    /// In-process producer registered under a prefix.
    Producer,
    /// Simulated connection to another forwarder.
    Link,
}

impl fmt::Display for FaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceKind::App => write!(f, "app"),
            FaceKind::Producer => write!(f, "producer"),
            FaceKind::Link => write!(f, "link"),
        }
    }
}

/// Packet type used in captures and observer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    Interest,
    Data,
    Nack,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Interest => write!(f, "Interest"),
            PacketKind::Data => write!(f, "Data"),
            PacketKind::Nack => write!(f, "Nack"),
        }
    }
}
