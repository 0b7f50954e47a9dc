//! Simulated connections between forwarders.
//!
//! A connection joins two forwarders with one link face on each side.
//! Every direction has its own FIFO queue served by a delivery task that
//! holds each packet until its due time, so packets never overtake each
//! other. Loss is decided per packet when it is sent, using the sending
//! forwarder's random number generator.

use log::{debug, info, trace};
use ndn_sim_common::metrics::{Counter, Gauge};
use ndn_sim_common::ndn::Packet;
use ndn_sim_common::types::{ConnectionId, FaceId, PacketKind};
use ndn_sim_common::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::config::validate_slowdown;
use crate::forwarder::{Forwarder, Ingress, IngressSink};

/// Due time used when a slowed-down latency does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

/// Latency and loss of a connection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkParams {
    /// One-way delay (in milliseconds)
    pub latency_ms: u64,

    /// Probability in [0, 1] that a packet is dropped
    pub loss: f64,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            latency_ms: 10,
            loss: 0.0,
        }
    }
}

impl LinkParams {
    pub fn new(latency_ms: u64, loss: f64) -> Self {
        Self { latency_ms, loss }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.loss) {
            return Err(Error::InvalidLink(format!(
                "loss must be within [0, 1], got {}",
                self.loss
            )));
        }
        Ok(())
    }
}

/// Record of one packet crossing a connection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureEvent {
    /// Milliseconds since the network was created
    pub timestamp_ms: u64,
    pub connection: ConnectionId,
    pub from_node: String,
    pub to_node: String,
    pub packet_type: PacketKind,
    pub name: String,
    /// Encoded size in bytes
    pub size: usize,
    pub lost: bool,
}

/// Knobs shared by every connection of a network
#[derive(Debug, Clone)]
pub struct LinkContext {
    epoch: Instant,
    slowdown_bits: Arc<AtomicU64>,
    capture_enabled: Arc<AtomicBool>,
    captures: mpsc::UnboundedSender<CaptureEvent>,
}

impl LinkContext {
    /// Creates a context and the receiver its capture events go to.
    pub fn new(slowdown: f64, capture: bool) -> Result<(Self, mpsc::UnboundedReceiver<CaptureEvent>)> {
        validate_slowdown(slowdown)?;
        let (captures, rx) = mpsc::unbounded_channel();
        let ctx = Self {
            epoch: Instant::now(),
            slowdown_bits: Arc::new(AtomicU64::new(slowdown.to_bits())),
            capture_enabled: Arc::new(AtomicBool::new(capture)),
            captures,
        };
        Ok((ctx, rx))
    }

    /// A context for connections made outside a network: no slowdown, no capture.
    pub fn detached() -> Self {
        let (captures, _) = mpsc::unbounded_channel();
        Self {
            epoch: Instant::now(),
            slowdown_bits: Arc::new(AtomicU64::new(1.0f64.to_bits())),
            capture_enabled: Arc::new(AtomicBool::new(false)),
            captures,
        }
    }

    pub fn slowdown(&self) -> f64 {
        f64::from_bits(self.slowdown_bits.load(Ordering::Relaxed))
    }

    /// Applies to packets sent from now on.
    pub fn set_slowdown(&self, slowdown: f64) -> Result<()> {
        validate_slowdown(slowdown)?;
        self.slowdown_bits.store(slowdown.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    pub fn capture_enabled(&self) -> bool {
        self.capture_enabled.load(Ordering::Relaxed)
    }

    pub fn set_capture(&self, enabled: bool) {
        self.capture_enabled.store(enabled, Ordering::Relaxed);
    }

    fn elapsed_ms(&self) -> u64 {
        Instant::now().duration_since(self.epoch).as_millis() as u64
    }
}

/// Traffic counters for one direction of a connection
#[derive(Debug, Default)]
pub struct DirectionCounters {
    pub sent_packets: Counter,
    pub sent_bytes: Counter,
    pub delivered_packets: Counter,
    pub lost_packets: Counter,
    pub in_flight: Gauge,
}

/// Serializable copy of [`DirectionCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionStats {
    pub sent_packets: u64,
    pub sent_bytes: u64,
    pub delivered_packets: u64,
    pub lost_packets: u64,
    pub in_flight: u64,
}

impl DirectionCounters {
    fn snapshot(&self) -> DirectionStats {
        DirectionStats {
            sent_packets: self.sent_packets.value(),
            sent_bytes: self.sent_bytes.value(),
            delivered_packets: self.delivered_packets.value(),
            lost_packets: self.lost_packets.value(),
            in_flight: self.in_flight.value(),
        }
    }
}

/// Per-connection statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStats {
    pub id: ConnectionId,
    pub node_a: String,
    pub node_b: String,
    pub params: LinkParams,
    pub a_to_b: DirectionStats,
    pub b_to_a: DirectionStats,
}

impl ConnectionStats {
    pub fn total_packets(&self) -> u64 {
        self.a_to_b.sent_packets + self.b_to_a.sent_packets
    }
}

/// One side of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl Side {
    fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

struct Transit {
    packet: Packet,
    due: Instant,
}

#[derive(Clone)]
struct Endpoint {
    face: FaceId,
    sink: IngressSink,
}

struct Shared {
    id: ConnectionId,
    nodes: [String; 2],
    latency_ms: AtomicU64,
    loss_bits: AtomicU64,
    /// Indexed by sending side
    counters: [DirectionCounters; 2],
    queues: [mpsc::UnboundedSender<Transit>; 2],
    endpoints: OnceLock<[Endpoint; 2]>,
    shutdown: watch::Sender<bool>,
    ctx: LinkContext,
}

impl Shared {
    fn params(&self) -> LinkParams {
        LinkParams {
            latency_ms: self.latency_ms.load(Ordering::Relaxed),
            loss: f64::from_bits(self.loss_bits.load(Ordering::Relaxed)),
        }
    }

    fn delay(&self) -> Duration {
        let ms = self.latency_ms.load(Ordering::Relaxed) as f64 * self.ctx.slowdown();
        Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX)
    }

    fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Stops delivery and tells both forwarders their face is gone.
    fn close(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        info!("Connection {} between {} and {} closed", self.id, self.nodes[0], self.nodes[1]);
        if let Some(endpoints) = self.endpoints.get() {
            for endpoint in endpoints {
                endpoint.sink.deliver(Ingress::FaceDown(endpoint.face));
            }
        }
    }

    fn capture(&self, packet: &Packet, size: usize, from: Side, lost: bool) {
        if !self.ctx.capture_enabled() {
            return;
        }
        let event = CaptureEvent {
            timestamp_ms: self.ctx.elapsed_ms(),
            connection: self.id,
            from_node: self.nodes[from.index()].clone(),
            to_node: self.nodes[from.other().index()].clone(),
            packet_type: packet.kind(),
            name: packet.name().to_string(),
            size,
            lost,
        };
        let _ = self.ctx.captures.send(event);
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("nodes", &self.nodes)
            .field("params", &self.params())
            .finish()
    }
}

/// The end of a connection owned by one forwarder's link face
#[derive(Debug, Clone)]
pub struct LinkEnd {
    shared: Arc<Shared>,
    side: Side,
}

impl LinkEnd {
    pub fn connection_id(&self) -> ConnectionId {
        self.shared.id
    }

    pub fn local_node(&self) -> &str {
        &self.shared.nodes[self.side.index()]
    }

    pub fn remote_node(&self) -> &str {
        &self.shared.nodes[self.side.other().index()]
    }

    /// Queues `packet` towards the remote forwarder unless the link drops it.
    pub(crate) fn send<R: Rng>(&self, packet: Packet, rng: &mut R) {
        let shared = &self.shared;
        if shared.is_closed() {
            trace!("Connection {} closed, dropping {}", shared.id, packet.name());
            return;
        }

        let counters = &shared.counters[self.side.index()];
        let size = packet.wire_size();
        counters.sent_packets.increment();
        counters.sent_bytes.add(size as u64);

        let loss = shared.params().loss;
        let lost = loss > 0.0 && rng.gen_bool(loss);
        shared.capture(&packet, size, self.side, lost);
        if lost {
            counters.lost_packets.increment();
            debug!(
                "Connection {} lost {} {} from {}",
                shared.id,
                packet.kind(),
                packet.name(),
                self.local_node()
            );
            return;
        }

        let now = Instant::now();
        let due = now.checked_add(shared.delay()).unwrap_or(now + FAR_FUTURE);
        counters.in_flight.increment();
        if shared.queues[self.side.index()].send(Transit { packet, due }).is_err() {
            counters.in_flight.decrement();
        }
    }

    pub(crate) fn close(&self) {
        self.shared.close();
    }
}

/// A bidirectional simulated link between two forwarders
#[derive(Debug, Clone)]
pub struct Connection {
    shared: Arc<Shared>,
    faces: [FaceId; 2],
}

impl Connection {
    /// Creates link faces on `a` and `b` and starts delivery in both directions.
    pub async fn establish(
        id: ConnectionId,
        a: &Forwarder,
        b: &Forwarder,
        params: LinkParams,
        ctx: LinkContext,
    ) -> Result<Self> {
        params.validate()?;

        let (tx_ab, rx_ab) = mpsc::unbounded_channel();
        let (tx_ba, rx_ba) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        let shared = Arc::new(Shared {
            id,
            nodes: [a.name().to_string(), b.name().to_string()],
            latency_ms: AtomicU64::new(params.latency_ms),
            loss_bits: AtomicU64::new(params.loss.to_bits()),
            counters: Default::default(),
            queues: [tx_ab, tx_ba],
            endpoints: OnceLock::new(),
            shutdown,
            ctx,
        });

        let face_a = a
            .add_link_face(LinkEnd {
                shared: Arc::clone(&shared),
                side: Side::A,
            })
            .await?;
        let face_b = match b
            .add_link_face(LinkEnd {
                shared: Arc::clone(&shared),
                side: Side::B,
            })
            .await
        {
            Ok(face) => face,
            Err(e) => {
                a.remove_face(face_a).await;
                return Err(e);
            }
        };

        let endpoints = [
            Endpoint {
                face: face_a,
                sink: a.sink(),
            },
            Endpoint {
                face: face_b,
                sink: b.sink(),
            },
        ];
        // Packets sent by A are delivered to B's face, and vice versa
        tokio::spawn(deliver(rx_ab, Arc::downgrade(&shared), shared.shutdown.subscribe(), Side::A, endpoints[1].clone()));
        tokio::spawn(deliver(rx_ba, Arc::downgrade(&shared), shared.shutdown.subscribe(), Side::B, endpoints[0].clone()));
        let _ = shared.endpoints.set(endpoints);

        info!(
            "Connection {} established: {} {} <-> {} {} ({} ms, loss {})",
            id,
            a.name(),
            face_a,
            b.name(),
            face_b,
            params.latency_ms,
            params.loss
        );

        Ok(Self {
            shared,
            faces: [face_a, face_b],
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    pub fn nodes(&self) -> (&str, &str) {
        (&self.shared.nodes[0], &self.shared.nodes[1])
    }

    pub fn faces(&self) -> (FaceId, FaceId) {
        (self.faces[0], self.faces[1])
    }

    /// Face used by `node` for this connection.
    pub fn face_of(&self, node: &str) -> Option<FaceId> {
        self.shared
            .nodes
            .iter()
            .position(|n| n == node)
            .map(|i| self.faces[i])
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        let (x, y) = self.nodes();
        (x == a && y == b) || (x == b && y == a)
    }

    pub fn params(&self) -> LinkParams {
        self.shared.params()
    }

    /// Updates latency and loss. Packets already in flight keep their due time.
    pub fn set_params(&self, params: LinkParams) -> Result<()> {
        params.validate()?;
        self.shared.latency_ms.store(params.latency_ms, Ordering::Relaxed);
        self.shared.loss_bits.store(params.loss.to_bits(), Ordering::Relaxed);
        debug!("Connection {} now {} ms, loss {}", self.id(), params.latency_ms, params.loss);
        Ok(())
    }

    pub fn counters(&self, from: Side) -> &DirectionCounters {
        &self.shared.counters[from.index()]
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            id: self.id(),
            node_a: self.shared.nodes[0].clone(),
            node_b: self.shared.nodes[1].clone(),
            params: self.params(),
            a_to_b: self.shared.counters[0].snapshot(),
            b_to_a: self.shared.counters[1].snapshot(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Stops the connection. Packets in flight are discarded.
    pub fn close(&self) {
        self.shared.close();
    }
}

/// Delivers one direction of a connection in FIFO order.
async fn deliver(
    mut queue: mpsc::UnboundedReceiver<Transit>,
    shared: Weak<Shared>,
    mut shutdown: watch::Receiver<bool>,
    from: Side,
    to: Endpoint,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        let transit = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            transit = queue.recv() => match transit {
                Some(transit) => transit,
                None => break,
            },
        };
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep_until(transit.due) => {}
        }

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let counters = &shared.counters[from.index()];
        counters.in_flight.decrement();
        counters.delivered_packets.increment();
        to.sink.deliver(Ingress::Packet {
            face: to.face,
            packet: transit.packet,
        });
    }
    trace!("Delivery task for {:?} side stopped", from);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_params_validation() {
        assert!(LinkParams::new(5, 0.0).validate().is_ok());
        assert!(LinkParams::new(5, 1.0).validate().is_ok());
        assert!(matches!(LinkParams::new(5, 1.5).validate(), Err(Error::InvalidLink(_))));
        assert!(LinkParams::new(5, -0.1).validate().is_err());
        assert!(LinkParams::new(5, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_context_slowdown() {
        let ctx = LinkContext::detached();
        assert_eq!(ctx.slowdown(), 1.0);
        ctx.set_slowdown(2.5).unwrap();
        assert_eq!(ctx.slowdown(), 2.5);
        assert!(ctx.set_slowdown(-1.0).is_err());
        assert!(!ctx.capture_enabled());
    }

    #[test]
    fn test_direction_stats_total() {
        let stats = ConnectionStats {
            id: ConnectionId(1),
            node_a: "a".into(),
            node_b: "b".into(),
            params: LinkParams::default(),
            a_to_b: DirectionStats {
                sent_packets: 3,
                ..Default::default()
            },
            b_to_a: DirectionStats {
                sent_packets: 2,
                ..Default::default()
            },
        };
        assert_eq!(stats.total_packets(), 5);
    }
}
