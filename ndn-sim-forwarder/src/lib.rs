//! Simulated NDN forwarding node.
//!
//! This crate provides the per-node forwarding engine of the simulator:
//! Content Store, Pending Interest Table, Dead Nonce List and FIB with
//! longest-prefix match, tied together by a [`Forwarder`] that exchanges
//! packets with local producers and with other forwarders over simulated
//! [`Connection`]s with configurable latency and loss.
//!
//! All timing uses `tokio::time`, so a runtime with paused time drives the
//! whole simulation deterministically.

pub mod config;
pub mod connection;
pub mod consumer;
pub mod cs;
pub mod dnl;
mod face;
pub mod fib;
mod forwarder;
pub mod network;
pub mod pit;
pub mod producer;
pub mod strategy;

pub use config::{ForwarderConfig, NetworkConfig};
pub use connection::{CaptureEvent, Connection, ConnectionStats, DirectionStats, LinkContext, LinkParams, Side};
pub use consumer::{Consumer, RetxPolicy};
pub use face::FaceInfo;
pub use fib::{FibEntry, NextHop, RouteOptions};
pub use forwarder::{Forwarder, ForwarderEvent, InterestOutcome, TableSizes};
pub use network::{Network, NodeTraffic};
pub use producer::{CertificateServer, FnProducer, PingServer, Producer, ProducerOptions};
pub use strategy::Strategy;
