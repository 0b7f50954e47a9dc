//! Error types for the ndn-sim implementation.

use thiserror::Error;

use crate::ndn::{NackReason, Name};
use crate::types::{ConnectionId, FaceId};

/// All possible errors that can occur within the simulator.
///
/// Nothing here is fatal to a forwarder: consumer outcomes (`Nacked`,
/// `Timeout`) are reported to the caller of `express_interest`, while the
/// remaining variants reject malformed input at registration time.
#[derive(Error, Debug)]
pub enum Error {
    /// Error related to TLV encoding.
    #[error("TLV error: {0}")]
    Tlv(String),

    /// The Interest was answered with a Nack.
    #[error("Interest {name} was nacked: {reason}")]
    Nacked { name: Name, reason: NackReason },

    /// No Data arrived within the Interest lifetime.
    #[error("Interest {0} timed out")]
    Timeout(Name),

    /// A prefix was registered twice with incompatible options.
    #[error("conflicting registration for {prefix}: {detail}")]
    ConflictingRegistration { prefix: Name, detail: String },

    /// Latency or loss outside the accepted range.
    #[error("invalid link parameters: {0}")]
    InvalidLink(String),

    /// The face does not exist on this forwarder.
    #[error("unknown face {0}")]
    UnknownFace(FaceId),

    /// The connection does not exist in the network.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// The node does not exist in the network.
    #[error("unknown node {0}")]
    UnknownNode(String),

    /// A node with this name already exists.
    #[error("duplicate node {0}")]
    DuplicateNode(String),

    /// The forwarder has been removed from the topology.
    #[error("forwarder {0} is closed")]
    Closed(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(String),
}
