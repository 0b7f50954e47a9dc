//! Simulated NDN forwarding mesh.
//!
//! This crate bundles the packet vocabulary from [`ndn_sim_common`] and the
//! forwarding engine from [`ndn_sim_forwarder`] behind one import path for
//! topology front ends.

pub use ndn_sim_common as common;
pub use ndn_sim_forwarder as forwarder;

pub use ndn_sim_common::ndn::{Data, Interest, Nack, NackReason, Name, Packet};
pub use ndn_sim_common::types::{ConnectionId, FaceId};
pub use ndn_sim_common::{Error, Result};
pub use ndn_sim_forwarder::{
    CaptureEvent, CertificateServer, Consumer, Forwarder, ForwarderConfig, ForwarderEvent, LinkParams, Network,
    NetworkConfig, PingServer, Producer, ProducerOptions, RetxPolicy, RouteOptions, Strategy,
};
