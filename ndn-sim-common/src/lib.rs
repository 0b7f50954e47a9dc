//! Common types and utilities for the ndn-sim forwarding simulator.
//!
//! This crate provides the protocol vocabulary shared by the forwarder,
//! the topology layer and the command line tools: names, Interest/Data/Nack
//! packets, NDN-TLV wire sizing, identifiers and metrics.

pub mod ndn;
pub mod tlv;
pub mod metrics;
pub mod types;
pub mod error;

/// Reexport of common types
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
