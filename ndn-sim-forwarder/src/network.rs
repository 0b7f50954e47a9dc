//! A collection of forwarders and the connections between them.
//!
//! [`Network`] is what the topology layer drives: it names nodes, wires
//! them together, and exposes traffic counters and packet captures.

use log::{info, warn};
use ndn_sim_common::ndn::Name;
use ndn_sim_common::types::ConnectionId;
use ndn_sim_common::{Error, Result};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

use crate::config::NetworkConfig;
use crate::connection::{CaptureEvent, Connection, ConnectionStats, LinkContext, LinkParams};
use crate::fib::RouteOptions;
use crate::forwarder::Forwarder;

/// Packet totals of one node, used to highlight the busiest node
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NodeTraffic {
    pub node: String,
    pub packets_received: u64,
    pub packets_sent: u64,
}

impl NodeTraffic {
    pub fn total(&self) -> u64 {
        self.packets_received + self.packets_sent
    }
}

#[derive(Debug)]
pub struct Network {
    config: NetworkConfig,
    ctx: LinkContext,
    captures: mpsc::UnboundedReceiver<CaptureEvent>,
    nodes: BTreeMap<String, Forwarder>,
    /// Nodes ever added; used to derive per-node seeds
    added: u64,
    connections: BTreeMap<ConnectionId, Connection>,
    next_connection: u32,
}

impl Network {
    pub fn new(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        let (ctx, captures) = LinkContext::new(config.latency_slowdown, config.capture)?;
        Ok(Self {
            config,
            ctx,
            captures,
            nodes: BTreeMap::new(),
            added: 0,
            connections: BTreeMap::new(),
            next_connection: 1,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Creates a forwarder named `name`.
    pub fn add_node(&mut self, name: &str) -> Result<Forwarder> {
        if self.nodes.contains_key(name) {
            return Err(Error::DuplicateNode(name.to_string()));
        }
        let forwarder = Forwarder::new(name, self.config.forwarder_config(self.added))?;
        self.added += 1;
        self.nodes.insert(name.to_string(), forwarder.clone());
        Ok(forwarder)
    }

    pub fn node(&self, name: &str) -> Option<&Forwarder> {
        self.nodes.get(name)
    }

    fn require(&self, name: &str) -> Result<&Forwarder> {
        self.nodes
            .get(name)
            .ok_or_else(|| Error::UnknownNode(name.to_string()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Forwarder> {
        self.nodes.values()
    }

    /// Removes a node and every connection touching it.
    pub async fn remove_node(&mut self, name: &str) -> Result<()> {
        let forwarder = self
            .nodes
            .remove(name)
            .ok_or_else(|| Error::UnknownNode(name.to_string()))?;

        let touching: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.face_of(name).is_some())
            .map(|c| c.id())
            .collect();
        for id in touching {
            self.disconnect(id).await?;
        }

        forwarder.close().await;
        info!("Node {} removed", name);
        Ok(())
    }

    /// Connects two nodes.
    pub async fn connect(&mut self, a: &str, b: &str, params: LinkParams) -> Result<ConnectionId> {
        if a == b {
            return Err(Error::InvalidLink(format!("cannot connect {} to itself", a)));
        }
        let node_a = self.require(a)?.clone();
        let node_b = self.require(b)?.clone();

        let id = ConnectionId(self.next_connection);
        let connection = Connection::establish(id, &node_a, &node_b, params, self.ctx.clone()).await?;
        self.next_connection += 1;
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Tears a connection down and removes its face on both nodes.
    pub async fn disconnect(&mut self, id: ConnectionId) -> Result<()> {
        let connection = self
            .connections
            .remove(&id)
            .ok_or(Error::UnknownConnection(id))?;
        connection.close();

        let (a, b) = connection.nodes();
        let (face_a, face_b) = connection.faces();
        for (node, face) in [(a, face_a), (b, face_b)] {
            if let Some(forwarder) = self.nodes.get(node) {
                forwarder.remove_face(face).await;
            }
        }
        Ok(())
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn connection_between(&self, a: &str, b: &str) -> Option<&Connection> {
        self.connections.values().find(|c| c.connects(a, b))
    }

    pub fn set_link_params(&self, id: ConnectionId, params: LinkParams) -> Result<()> {
        self.connections
            .get(&id)
            .ok_or(Error::UnknownConnection(id))?
            .set_params(params)
    }

    /// Routes `prefix` on `node` through connection `via`.
    pub async fn add_route(&self, node: &str, prefix: &Name, via: ConnectionId, opts: RouteOptions) -> Result<()> {
        let forwarder = self.require(node)?;
        let connection = self
            .connections
            .get(&via)
            .ok_or(Error::UnknownConnection(via))?;
        let face = connection.face_of(node).ok_or_else(|| {
            Error::InvalidLink(format!("{} does not terminate at {}", via, node))
        })?;
        forwarder.add_route(prefix, face, opts).await
    }

    /// Routes `prefix` on `node` towards its neighbor `next_hop`.
    pub async fn add_route_via(&self, node: &str, prefix: &Name, next_hop: &str, opts: RouteOptions) -> Result<()> {
        let id = self
            .connection_between(node, next_hop)
            .map(|c| c.id())
            .ok_or_else(|| Error::InvalidLink(format!("{} is not connected to {}", node, next_hop)))?;
        self.add_route(node, prefix, id, opts).await
    }

    /// Scales every link latency; applies to packets sent afterwards.
    pub fn set_latency_slowdown(&mut self, slowdown: f64) -> Result<()> {
        self.ctx.set_slowdown(slowdown)?;
        self.config.latency_slowdown = slowdown;
        Ok(())
    }

    pub fn set_capture(&mut self, enabled: bool) {
        self.ctx.set_capture(enabled);
        self.config.capture = enabled;
    }

    /// Takes every capture event recorded so far, oldest first.
    pub fn drain_captures(&mut self) -> Vec<CaptureEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.captures.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn connection_stats(&self) -> Vec<ConnectionStats> {
        self.connections.values().map(Connection::stats).collect()
    }

    /// Connection that carried the most packets, if any carried one.
    pub fn busiest_connection(&self) -> Option<ConnectionStats> {
        self.connection_stats()
            .into_iter()
            .filter(|s| s.total_packets() > 0)
            .max_by_key(|s| s.total_packets())
    }

    pub fn node_traffic(&self) -> Vec<NodeTraffic> {
        self.nodes
            .values()
            .map(|f| {
                let metrics = f.metrics();
                NodeTraffic {
                    node: f.name().to_string(),
                    packets_received: metrics.packets_received.value(),
                    packets_sent: metrics.packets_sent.value(),
                }
            })
            .collect()
    }

    pub fn busiest_node(&self) -> Option<NodeTraffic> {
        self.node_traffic()
            .into_iter()
            .filter(|t| t.total() > 0)
            .max_by_key(|t| t.total())
    }

    /// FIB of every node, rendered for inspection.
    pub async fn fib_states(&self) -> BTreeMap<String, String> {
        let mut states = BTreeMap::new();
        for (name, forwarder) in &self.nodes {
            states.insert(name.clone(), forwarder.fib_state().await);
        }
        states
    }

    /// Closes every connection and node.
    pub async fn shutdown(&mut self) {
        for (_, connection) in std::mem::take(&mut self.connections) {
            connection.close();
        }
        for (name, forwarder) in std::mem::take(&mut self.nodes) {
            forwarder.close().await;
            if !forwarder.is_closed().await {
                warn!("Node {} did not close", name);
            }
        }
    }
}
