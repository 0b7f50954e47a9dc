//! The forwarding node.
//!
//! A [`Forwarder`] owns one CS, PIT, DNL and FIB plus its faces. Every
//! packet, whatever face it came from, is fed through a single ingress
//! queue and processed to completion under the state lock, so the tables
//! are only ever mutated by one packet at a time.

use log::{debug, info, trace, warn};
use ndn_sim_common::metrics::ForwarderMetrics;
use ndn_sim_common::ndn::{Data, Interest, Nack, NackReason, Name, Packet};
use ndn_sim_common::types::{FaceId, FaceKind, PacketKind};
use ndn_sim_common::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::time::{timeout, Instant, MissedTickBehavior};

use crate::config::ForwarderConfig;
use crate::connection::LinkEnd;
use crate::cs::ContentStore;
use crate::dnl::DeadNonceList;
use crate::face::{FaceHandle, FaceInfo, FaceTable, ProducerFace};
use crate::fib::{Fib, FibEntry, RouteOptions};
use crate::pit::{NackOutcome, Pit, PitEntry, PitInsert, PitKey};
use crate::producer::{Producer, ProducerOptions};
use crate::strategy::{self, Strategy};

/// Something for the forwarder to process
#[derive(Debug)]
pub(crate) enum Ingress {
    Packet { face: FaceId, packet: Packet },
    FaceDown(FaceId),
}

/// Entry point into a forwarder's ingress queue
#[derive(Debug, Clone)]
pub(crate) struct IngressSink(mpsc::UnboundedSender<Ingress>);

impl IngressSink {
    pub fn deliver(&self, ingress: Ingress) {
        // A closed forwarder no longer listens
        let _ = self.0.send(ingress);
    }
}

/// Events published to observers
#[derive(Debug, Clone, PartialEq)]
pub enum ForwarderEvent {
    FaceAdded { face: FaceId, kind: FaceKind },
    FaceRemoved { face: FaceId },
    PacketReceived { face: FaceId, kind: PacketKind, name: Name },
    PacketSent { face: FaceId, kind: PacketKind, name: Name },
    ContentStoreHit { name: Name },
    InterestAggregated { name: Name, face: FaceId },
    LoopDropped { name: Name, nonce: u32, face: FaceId },
    NoRoute { name: Name },
    InterestTimedOut { name: Name },
}

/// What happened to an incoming Interest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterestOutcome {
    /// Answered from the Content Store
    SatisfiedByCs,
    /// Duplicate nonce, dropped silently
    LoopDropped,
    /// Joined an existing PIT entry
    Aggregated,
    /// Sent on these faces
    Forwarded(Vec<FaceId>),
    /// Answered with a no-route Nack
    NoRoute,
}

/// Sizes of the forwarding tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct TableSizes {
    pub cs: usize,
    pub pit: usize,
    pub dnl: usize,
    pub fib: usize,
    pub faces: usize,
}

struct Waiter {
    interest: Interest,
    tx: oneshot::Sender<Result<Data>>,
}

struct State {
    faces: FaceTable,
    cs: ContentStore,
    pit: Pit,
    dnl: DeadNonceList,
    fib: Fib,
    /// Interests expressed through the application face
    waiters: BTreeMap<u64, Waiter>,
    next_waiter: u64,
    rng: StdRng,
    closed: bool,
}

struct Inner {
    name: String,
    config: ForwarderConfig,
    state: Mutex<State>,
    sink: IngressSink,
    events: broadcast::Sender<ForwarderEvent>,
    metrics: Arc<ForwarderMetrics>,
}

/// A simulated NDN forwarding node. Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct Forwarder {
    inner: Arc<Inner>,
}

impl fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forwarder")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Forwarder {
    /// Creates a forwarder and starts its ingress and PIT sweep tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(name: impl Into<String>, config: ForwarderConfig) -> Result<Self> {
        config.validate()?;
        let name = name.into();

        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_buffer_size);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let state = State {
            faces: FaceTable::new(),
            cs: ContentStore::new(config.cs_capacity),
            pit: Pit::new(),
            dnl: DeadNonceList::new(config.dnl_retention()),
            fib: Fib::new(),
            waiters: BTreeMap::new(),
            next_waiter: 0,
            rng,
            closed: false,
        };

        let sweep = config.pit_sweep_interval();
        let inner = Arc::new(Inner {
            name,
            config,
            state: Mutex::new(state),
            sink: IngressSink(tx),
            events,
            metrics: Arc::new(ForwarderMetrics::new()),
        });

        tokio::spawn(run_ingress(Arc::downgrade(&inner), rx));
        tokio::spawn(run_sweeper(Arc::downgrade(&inner), sweep));

        info!("[Node {}] Forwarder started", inner.name);
        Ok(Self { inner })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> Arc<ForwarderMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Registers an observer. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ForwarderEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn sink(&self) -> IngressSink {
        self.inner.sink.clone()
    }

    /// Sends `interest` from the local application and waits for the outcome.
    ///
    /// Resolves with the first matching Data. Fails with [`Error::Nacked`]
    /// when the network answers with a Nack and with [`Error::Timeout`] when
    /// nothing arrives within the Interest lifetime.
    pub async fn express_interest(&self, interest: Interest) -> Result<Data> {
        let name = interest.name.clone();
        let lifetime = interest.lifetime;
        let start = Instant::now();
        let (tx, rx) = oneshot::channel();

        let token = {
            let mut state = self.inner.state.lock().await;
            if state.closed {
                return Err(Error::Closed(self.inner.name.clone()));
            }
            let token = state.next_waiter;
            state.next_waiter += 1;
            state.waiters.insert(
                token,
                Waiter {
                    interest: interest.clone(),
                    tx,
                },
            );
            self.inner.metrics.interests_expressed.increment();
            debug!("[Node {}] Express Interest: {}", self.inner.name, name);
            self.handle(
                &mut state,
                Ingress::Packet {
                    face: FaceId::APP,
                    packet: Packet::Interest(interest),
                },
            );
            token
        };

        match timeout(lifetime, rx).await {
            Ok(Ok(Ok(data))) => {
                let rtt = start.elapsed().as_micros() as u64;
                debug!("[Node {}] Received Data for {}, RTT: {}µs", self.inner.name, name, rtt);
                self.inner.metrics.interest_rtt.observe(rtt);
                Ok(data)
            }
            Ok(Ok(Err(e))) => {
                debug!("[Node {}] Interest {} failed: {}", self.inner.name, name, e);
                Err(e)
            }
            Ok(Err(_)) => Err(Error::Closed(self.inner.name.clone())),
            Err(_) => {
                self.inner.state.lock().await.waiters.remove(&token);
                self.inner.metrics.interests_timed_out.increment();
                debug!("[Node {}] Interest timed out: {}", self.inner.name, name);
                Err(Error::Timeout(name))
            }
        }
    }

    /// Attaches `producer` under `prefix` and routes the prefix to it.
    pub async fn register_prefix<P: Producer>(
        &self,
        prefix: impl Into<Name>,
        producer: P,
        opts: ProducerOptions,
    ) -> Result<FaceId> {
        let prefix = prefix.into();
        let mut state = self.inner.state.lock().await;
        if state.closed {
            return Err(Error::Closed(self.inner.name.clone()));
        }
        state.fib.check_registration(&prefix, opts.capture)?;

        let face = state.faces.add(FaceHandle::Producer(ProducerFace {
            producer: Arc::new(producer),
            prefix: prefix.clone(),
            cache: opts.cache,
        }));
        let route = RouteOptions {
            cost: 0,
            capture: opts.capture,
        };
        if let Err(e) = state.fib.register(&prefix, face, route) {
            state.faces.remove(face);
            return Err(e);
        }

        info!("[Node {}] Registered producer for {} on {}", self.inner.name, prefix, face);
        self.emit(ForwarderEvent::FaceAdded {
            face,
            kind: FaceKind::Producer,
        });
        Ok(face)
    }

    pub(crate) async fn add_link_face(&self, end: LinkEnd) -> Result<FaceId> {
        let mut state = self.inner.state.lock().await;
        if state.closed {
            return Err(Error::Closed(self.inner.name.clone()));
        }
        let remote = end.remote_node().to_string();
        let face = state.faces.add(FaceHandle::Link(end));
        debug!("[Node {}] Link face {} to {}", self.inner.name, face, remote);
        self.emit(ForwarderEvent::FaceAdded {
            face,
            kind: FaceKind::Link,
        });
        Ok(face)
    }

    /// Adds a FIB route for `prefix` through an existing face.
    pub async fn add_route(&self, prefix: &Name, face: FaceId, opts: RouteOptions) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if face == FaceId::APP || !state.faces.contains(face) {
            return Err(Error::UnknownFace(face));
        }
        state.fib.register(prefix, face, opts)
    }

    pub async fn remove_route(&self, prefix: &Name, face: FaceId) -> bool {
        self.inner.state.lock().await.fib.unregister(prefix, face)
    }

    pub async fn set_strategy(&self, prefix: &Name, strategy: Strategy) {
        self.inner.state.lock().await.fib.set_strategy(prefix, strategy);
    }

    /// Longest matching FIB entry with a next hop, as the forwarder would use it.
    pub async fn fib_lookup(&self, name: &Name) -> Option<FibEntry> {
        self.inner.state.lock().await.fib.longest_match(name).cloned()
    }

    /// FIB contents rendered for inspection, one prefix per line.
    pub async fn fib_state(&self) -> String {
        self.inner.state.lock().await.fib.to_string()
    }

    /// Caches `data` as if it had been forwarded through this node.
    pub async fn insert_into_cs(&self, data: Data) {
        let mut state = self.inner.state.lock().await;
        let evicted = state.cs.insert(data, Instant::now());
        self.inner.metrics.cs_inserts.increment();
        self.inner.metrics.cs_evictions.add(evicted as u64);
        self.inner.metrics.cs_size.set(state.cs.len() as u64);
    }

    pub async fn faces(&self) -> Vec<FaceInfo> {
        self.inner.state.lock().await.faces.info()
    }

    pub async fn table_sizes(&self) -> TableSizes {
        let state = self.inner.state.lock().await;
        TableSizes {
            cs: state.cs.len(),
            pit: state.pit.len(),
            dnl: state.dnl.len(),
            fib: state.fib.len(),
            faces: state.faces.info().len(),
        }
    }

    /// Removes a face together with its routes and PIT records.
    pub async fn remove_face(&self, face: FaceId) -> bool {
        let mut state = self.inner.state.lock().await;
        self.detach_face(&mut state, face)
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.state.lock().await.closed
    }

    /// Stops the forwarder: closes its connections and fails pending Interests.
    pub async fn close(&self) {
        let mut state = self.inner.state.lock().await;
        if state.closed {
            return;
        }
        state.closed = true;

        for (face, handle) in state.faces.drain() {
            if let FaceHandle::Link(end) = handle {
                end.close();
            }
            self.emit(ForwarderEvent::FaceRemoved { face });
        }
        for (_, waiter) in std::mem::take(&mut state.waiters) {
            let _ = waiter.tx.send(Err(Error::Closed(self.inner.name.clone())));
        }
        state.cs.clear();
        state.pit.clear();
        state.dnl.clear();
        state.fib.clear();
        self.inner.metrics.cs_size.set(0);
        self.inner.metrics.pit_size.set(0);

        info!("[Node {}] Forwarder closed", self.inner.name);
    }

    fn emit(&self, event: ForwarderEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    fn handle(&self, state: &mut State, ingress: Ingress) {
        if state.closed {
            return;
        }
        match ingress {
            Ingress::Packet { face, packet } => {
                if !state.faces.contains(face) {
                    trace!("[Node {}] Dropping {} from removed {}", self.inner.name, packet.name(), face);
                    return;
                }
                let metrics = &self.inner.metrics;
                metrics.packets_received.increment();
                metrics.bytes_received.add(packet.wire_size() as u64);
                self.emit(ForwarderEvent::PacketReceived {
                    face,
                    kind: packet.kind(),
                    name: packet.name().clone(),
                });

                match packet {
                    Packet::Interest(interest) => {
                        let name = interest.name.clone();
                        let outcome = self.on_interest(state, face, interest);
                        debug!("[Node {}] Interest {} from {}: {:?}", self.inner.name, name, face, outcome);
                    }
                    Packet::Data(data) => self.on_data(state, face, data),
                    Packet::Nack(nack) => self.on_nack(state, face, nack),
                }
            }
            Ingress::FaceDown(face) => {
                self.detach_face(state, face);
            }
        }
    }

    fn on_interest(&self, state: &mut State, in_face: FaceId, interest: Interest) -> InterestOutcome {
        let metrics = &self.inner.metrics;
        let now = Instant::now();
        metrics.interests_received.increment();

        if let Some(data) = state.cs.lookup(&interest, now) {
            metrics.cs_hits.increment();
            metrics.cs_size.set(state.cs.len() as u64);
            self.emit(ForwarderEvent::ContentStoreHit {
                name: data.name.clone(),
            });
            self.send_to_face(state, in_face, Packet::Data(data));
            return InterestOutcome::SatisfiedByCs;
        }
        metrics.cs_misses.increment();

        // An entry the sweeper has not reached yet must not absorb this Interest
        if let Some(entry) = state.pit.take_expired(&PitKey::of(&interest), now) {
            self.retire_expired(state, &entry, now);
        }

        if state.dnl.contains(&interest.name, interest.nonce, now) {
            return self.drop_looped(&interest, in_face);
        }

        match state.pit.insert_or_aggregate(&interest, in_face, now) {
            PitInsert::DuplicateNonce => return self.drop_looped(&interest, in_face),
            PitInsert::Aggregated => {
                metrics.interests_aggregated.increment();
                self.emit(ForwarderEvent::InterestAggregated {
                    name: interest.name.clone(),
                    face: in_face,
                });
                return InterestOutcome::Aggregated;
            }
            PitInsert::New => {
                metrics.pit_inserts.increment();
                metrics.pit_size.set(state.pit.len() as u64);
            }
        }

        let key = PitKey::of(&interest);
        let candidates = strategy::collect_candidates(&state.fib.all_matches(&interest.name));
        let links = state.faces.link_faces();
        let decision = candidates
            .as_ref()
            .map(|c| (c.strategy.select(&c.hops, in_face, &links), c.prefix.clone()));

        let exhausted = interest.hop_limit == Some(0);
        let targets: Vec<FaceId> = decision
            .as_ref()
            .map(|(d, _)| d.faces.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|face| !(exhausted && matches!(state.faces.get(*face), Some(FaceHandle::Link(_)))))
            .collect();

        if targets.is_empty() {
            metrics.fib_misses.increment();
            state.pit.remove(&key);
            metrics.pit_size.set(state.pit.len() as u64);
            self.emit(ForwarderEvent::NoRoute {
                name: interest.name.clone(),
            });
            debug!("[Node {}] No route for {}", self.inner.name, interest.name);
            self.send_to_face(state, in_face, Packet::Nack(Nack::new(interest, NackReason::NoRoute)));
            return InterestOutcome::NoRoute;
        }

        if let Some((d, prefix)) = &decision {
            if d.learn {
                if let Some(entry) = state.pit.get_mut(&key) {
                    entry.learn_prefix = Some(prefix.clone());
                }
            }
        }

        let expires_at = now + interest.lifetime;
        for face in &targets {
            let mut copy = interest.clone();
            if let Some(FaceHandle::Link(_)) = state.faces.get(*face) {
                copy.hop_limit = copy.hop_limit.map(|h| h.saturating_sub(1));
            }
            state.pit.add_out_record(&key, *face, interest.nonce, expires_at);
            metrics.interests_forwarded.increment();
            self.send_to_face(state, *face, Packet::Interest(copy));
        }
        InterestOutcome::Forwarded(targets)
    }

    fn drop_looped(&self, interest: &Interest, in_face: FaceId) -> InterestOutcome {
        self.inner.metrics.interests_looped.increment();
        debug!(
            "[Node {}] Dropping looped Interest {} (nonce {}) from {}",
            self.inner.name, interest.name, interest.nonce, in_face
        );
        self.emit(ForwarderEvent::LoopDropped {
            name: interest.name.clone(),
            nonce: interest.nonce,
            face: in_face,
        });
        InterestOutcome::LoopDropped
    }

    fn on_data(&self, state: &mut State, in_face: FaceId, data: Data) {
        let metrics = &self.inner.metrics;
        let now = Instant::now();
        metrics.data_received.increment();

        let satisfied = state.pit.satisfy(&data);
        metrics.pit_size.set(state.pit.len() as u64);
        if satisfied.is_empty() {
            metrics.data_unsolicited.increment();
            debug!("[Node {}] Dropping unsolicited Data {} from {}", self.inner.name, data.name, in_face);
            return;
        }

        if self.inner.config.cache_forwarded || state.faces.is_caching_producer(in_face) {
            let evicted = state.cs.insert(data.clone(), now);
            metrics.cs_inserts.increment();
            metrics.cs_evictions.add(evicted as u64);
            metrics.cs_size.set(state.cs.len() as u64);
        }

        let mut delivered = BTreeSet::new();
        for entry in satisfied {
            metrics.interests_satisfied.increment();
            for nonce in &entry.nonces {
                state.dnl.record_if_new(entry.name(), *nonce, now);
            }
            if let Some(prefix) = &entry.learn_prefix {
                self.learn_route(state, prefix, &data, in_face);
            }
            for (face, record) in &entry.in_records {
                if *face == in_face || record.expires_at <= now {
                    continue;
                }
                if delivered.insert(*face) {
                    self.send_to_face(state, *face, Packet::Data(data.clone()));
                }
            }
        }
    }

    /// Points a route at the face a flooded Interest was answered on.
    fn learn_route(&self, state: &mut State, matched: &Name, data: &Data, in_face: FaceId) {
        if !matches!(state.faces.get(in_face), Some(FaceHandle::Link(_))) {
            return;
        }
        let len = data.name.len().saturating_sub(1).max(matched.len());
        let prefix = data.name.prefix(len);
        let capture = state.fib.get(&prefix).map_or(true, |e| e.capture);
        let route = RouteOptions { cost: 0, capture };
        match state.fib.register(&prefix, in_face, route) {
            Ok(()) => debug!("[Node {}] Learned route {} -> {}", self.inner.name, prefix, in_face),
            Err(e) => warn!("[Node {}] Could not learn route {}: {}", self.inner.name, prefix, e),
        }
    }

    fn on_nack(&self, state: &mut State, in_face: FaceId, nack: Nack) {
        self.inner.metrics.nacks_received.increment();
        match state.pit.on_nack(&nack, in_face) {
            NackOutcome::Ignored => {
                debug!("[Node {}] Ignoring Nack for {} from {}", self.inner.name, nack.name(), in_face);
            }
            NackOutcome::Pending => {
                trace!("[Node {}] Nack for {} from {}, other upstreams pending", self.inner.name, nack.name(), in_face);
            }
            NackOutcome::Exhausted(entry) => {
                self.inner.metrics.pit_size.set(state.pit.len() as u64);
                for (face, record) in entry.in_records {
                    if face == in_face {
                        continue;
                    }
                    let downstream = Nack::new(record.interest, nack.reason);
                    self.send_to_face(state, face, Packet::Nack(downstream));
                }
            }
        }
    }

    fn send_to_face(&self, state: &mut State, face: FaceId, packet: Packet) {
        let Some(handle) = state.faces.get(face).cloned() else {
            trace!("[Node {}] {} is gone, dropping {}", self.inner.name, face, packet.name());
            return;
        };

        let metrics = &self.inner.metrics;
        let kind = packet.kind();
        metrics.packets_sent.increment();
        metrics.bytes_sent.add(packet.wire_size() as u64);
        match kind {
            PacketKind::Data => metrics.data_sent.increment(),
            PacketKind::Nack => metrics.nacks_sent.increment(),
            PacketKind::Interest => {}
        }
        self.emit(ForwarderEvent::PacketSent {
            face,
            kind,
            name: packet.name().clone(),
        });

        match handle {
            FaceHandle::App => Self::deliver_to_app(state, packet),
            FaceHandle::Link(end) => end.send(packet, &mut state.rng),
            FaceHandle::Producer(producer) => match packet {
                Packet::Interest(interest) => self.spawn_producer(face, producer, interest),
                other => trace!("[Node {}] Producer {} ignores {}", self.inner.name, face, other.kind()),
            },
        }
    }

    /// Resolves application waiters answered by `packet`.
    fn deliver_to_app(state: &mut State, packet: Packet) {
        let answered: Vec<u64> = state
            .waiters
            .iter()
            .filter(|(_, w)| match &packet {
                Packet::Data(data) => w.interest.matches_data(data),
                Packet::Nack(nack) => w.interest.same_selectors(&nack.interest),
                Packet::Interest(_) => false,
            })
            .map(|(token, _)| *token)
            .collect();

        for token in answered {
            let Some(waiter) = state.waiters.remove(&token) else {
                continue;
            };
            let outcome = match &packet {
                Packet::Data(data) => Ok(data.clone()),
                Packet::Nack(nack) => Err(Error::Nacked {
                    name: nack.name().clone(),
                    reason: nack.reason,
                }),
                Packet::Interest(_) => continue,
            };
            let _ = waiter.tx.send(outcome);
        }
    }

    fn spawn_producer(&self, face: FaceId, producer: ProducerFace, interest: Interest) {
        let sink = self.inner.sink.clone();
        let node = self.inner.name.clone();
        tokio::spawn(async move {
            let name = interest.name.clone();
            match producer.producer.produce(interest).await {
                Some(data) => sink.deliver(Ingress::Packet {
                    face,
                    packet: Packet::Data(data),
                }),
                None => debug!("[Node {}] Producer {} has no Data for {}", node, producer.prefix, name),
            }
        });
    }

    fn detach_face(&self, state: &mut State, face: FaceId) -> bool {
        let Some(handle) = state.faces.remove(face) else {
            return false;
        };
        if let FaceHandle::Link(end) = &handle {
            end.close();
        }
        let routes = state.fib.remove_face(face);
        let orphaned = state.pit.remove_face(face);
        self.inner.metrics.pit_size.set(state.pit.len() as u64);
        info!(
            "[Node {}] Removed {} ({} routes, {} pending Interests)",
            self.inner.name,
            face,
            routes,
            orphaned.len()
        );
        self.emit(ForwarderEvent::FaceRemoved { face });
        true
    }

    /// Drops PIT entries whose in-records have all expired.
    async fn sweep(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.closed {
            return false;
        }
        let now = Instant::now();
        let expired = state.pit.expire(now);
        if expired.is_empty() {
            return true;
        }
        for entry in &expired {
            self.retire_expired(&mut state, entry, now);
        }
        true
    }

    /// Books an expired PIT entry: its nonces move to the DNL.
    fn retire_expired(&self, state: &mut State, entry: &PitEntry, now: Instant) {
        for nonce in &entry.nonces {
            state.dnl.record_if_new(entry.name(), *nonce, now);
        }
        self.inner.metrics.pit_expirations.increment();
        self.inner.metrics.pit_size.set(state.pit.len() as u64);
        debug!("[Node {}] PIT entry {} timed out", self.inner.name, entry.name());
        self.emit(ForwarderEvent::InterestTimedOut {
            name: entry.name().clone(),
        });
    }
}

async fn run_ingress(inner: Weak<Inner>, mut rx: mpsc::UnboundedReceiver<Ingress>) {
    while let Some(ingress) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let forwarder = Forwarder { inner };
        let mut state = forwarder.inner.state.lock().await;
        if state.closed {
            break;
        }
        forwarder.handle(&mut state, ingress);
    }
    trace!("Ingress task stopped");
}

async fn run_sweeper(inner: Weak<Inner>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !(Forwarder { inner }).sweep().await {
            break;
        }
    }
    trace!("PIT sweep task stopped");
}
