//! PIT (Pending Interest Table) operations.
//!
//! This module handles the Pending Interest Table, which tracks forwarded
//! Interests so returning Data can be sent back towards every requester.
//! Entries are keyed by name plus selectors; Interests that differ only in
//! nonce or lifetime are aggregated into one entry.

use log::{debug, trace};
use ndn_sim_common::ndn::{Data, Interest, Nack, NackReason, Name};
use ndn_sim_common::types::FaceId;
use std::collections::{BTreeMap, HashSet};
use tokio::time::Instant;

/// Identity of a PIT entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PitKey {
    pub name: Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
}

impl PitKey {
    pub fn of(interest: &Interest) -> Self {
        Self {
            name: interest.name.clone(),
            can_be_prefix: interest.can_be_prefix,
            must_be_fresh: interest.must_be_fresh,
        }
    }
}

/// Downstream that asked for the entry
#[derive(Debug, Clone)]
pub struct InRecord {
    /// Latest Interest received on this face
    pub interest: Interest,
    pub expires_at: Instant,
}

/// Upstream the entry was forwarded to
#[derive(Debug, Clone)]
pub struct OutRecord {
    pub nonce: u32,
    pub expires_at: Instant,
    /// Set once the upstream answered with a Nack
    pub nack: Option<NackReason>,
}

/// A pending Interest
#[derive(Debug, Clone)]
pub struct PitEntry {
    pub key: PitKey,
    /// Every nonce seen for this entry
    pub nonces: HashSet<u32>,
    pub in_records: BTreeMap<FaceId, InRecord>,
    pub out_records: BTreeMap<FaceId, OutRecord>,
    pub created_at: Instant,
    /// Prefix to learn a route for when Data returns
    pub learn_prefix: Option<Name>,
}

impl PitEntry {
    fn new(interest: &Interest, in_face: FaceId, now: Instant) -> Self {
        let mut entry = Self {
            key: PitKey::of(interest),
            nonces: HashSet::new(),
            in_records: BTreeMap::new(),
            out_records: BTreeMap::new(),
            created_at: now,
            learn_prefix: None,
        };
        entry.add_in_record(interest, in_face, now);
        entry
    }

    pub fn name(&self) -> &Name {
        &self.key.name
    }

    /// Latest expiry across in-records.
    pub fn expires_at(&self) -> Option<Instant> {
        self.in_records.values().map(|r| r.expires_at).max()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at().map_or(true, |at| at <= now)
    }

    /// A nonce already seen on the entry but arriving on a face that did not
    /// send it means the Interest went round a cycle.
    fn is_loop(&self, nonce: u32, in_face: FaceId) -> bool {
        self.nonces.contains(&nonce)
            && self.in_records.get(&in_face).map(|r| r.interest.nonce) != Some(nonce)
    }

    fn add_in_record(&mut self, interest: &Interest, in_face: FaceId, now: Instant) {
        self.nonces.insert(interest.nonce);
        self.in_records.insert(
            in_face,
            InRecord {
                interest: interest.clone(),
                expires_at: now + interest.lifetime,
            },
        );
    }

    fn all_upstreams_nacked(&self) -> bool {
        !self.out_records.is_empty() && self.out_records.values().all(|r| r.nack.is_some())
    }
}

/// Result of [`Pit::insert_or_aggregate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitInsert {
    /// A new entry was created and must be forwarded
    New,
    /// An in-record was added to an existing entry
    Aggregated,
    /// The nonce was already seen from another face
    DuplicateNonce,
}

/// Result of [`Pit::on_nack`]
#[derive(Debug)]
pub enum NackOutcome {
    /// No matching entry or out-record
    Ignored,
    /// Other upstreams may still answer
    Pending,
    /// Every upstream nacked; the entry was removed
    Exhausted(PitEntry),
}

/// Pending Interest Table for one forwarder
#[derive(Debug, Default)]
pub struct Pit {
    entries: BTreeMap<PitKey, PitEntry>,
}

impl Pit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records `interest` arriving on `in_face`.
    ///
    /// An entry that expired but was not swept yet is replaced, never
    /// aggregated into.
    pub fn insert_or_aggregate(&mut self, interest: &Interest, in_face: FaceId, now: Instant) -> PitInsert {
        let key = PitKey::of(interest);
        match self.entries.get_mut(&key) {
            Some(entry) if !entry.is_expired(now) => {
                if entry.is_loop(interest.nonce, in_face) {
                    debug!("Duplicate nonce {} for {} from {}", interest.nonce, key.name, in_face);
                    return PitInsert::DuplicateNonce;
                }
                entry.add_in_record(interest, in_face, now);
                trace!("Aggregated {} from {}", key.name, in_face);
                PitInsert::Aggregated
            }
            _ => {
                self.entries.insert(key, PitEntry::new(interest, in_face, now));
                PitInsert::New
            }
        }
    }

    pub fn get(&self, key: &PitKey) -> Option<&PitEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &PitKey) -> Option<&mut PitEntry> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &PitKey) -> Option<PitEntry> {
        self.entries.remove(key)
    }

    /// Notes that the entry was forwarded on `face`.
    pub fn add_out_record(&mut self, key: &PitKey, face: FaceId, nonce: u32, expires_at: Instant) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.out_records.insert(
                face,
                OutRecord {
                    nonce,
                    expires_at,
                    nack: None,
                },
            );
        }
    }

    /// Removes and returns every entry `data` satisfies.
    pub fn satisfy(&mut self, data: &Data) -> Vec<PitEntry> {
        let full = data.name.len();
        let mut satisfied = Vec::new();

        for len in 0..=full {
            let name = data.name.prefix(len);
            for must_be_fresh in [false, true] {
                if len == full {
                    self.take(&name, false, must_be_fresh, &mut satisfied);
                }
                self.take(&name, true, must_be_fresh, &mut satisfied);
            }
        }
        satisfied
    }

    fn take(&mut self, name: &Name, can_be_prefix: bool, must_be_fresh: bool, out: &mut Vec<PitEntry>) {
        let key = PitKey {
            name: name.clone(),
            can_be_prefix,
            must_be_fresh,
        };
        if let Some(entry) = self.entries.remove(&key) {
            out.push(entry);
        }
    }

    /// Applies a Nack received from upstream `face`.
    pub fn on_nack(&mut self, nack: &Nack, face: FaceId) -> NackOutcome {
        let key = PitKey::of(&nack.interest);
        let Some(entry) = self.entries.get_mut(&key) else {
            return NackOutcome::Ignored;
        };
        let Some(out) = entry.out_records.get_mut(&face) else {
            return NackOutcome::Ignored;
        };
        if out.nonce != nack.interest.nonce {
            return NackOutcome::Ignored;
        }
        out.nack = Some(nack.reason);

        if !entry.all_upstreams_nacked() {
            return NackOutcome::Pending;
        }
        match self.entries.remove(&key) {
            Some(entry) => NackOutcome::Exhausted(entry),
            None => NackOutcome::Ignored,
        }
    }

    /// Removes and returns entries whose in-records have all expired.
    pub fn expire(&mut self, now: Instant) -> Vec<PitEntry> {
        let expired: Vec<PitKey> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.key.clone())
            .collect();
        expired
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }

    /// Removes the entry under `key` if it has expired.
    pub fn take_expired(&mut self, key: &PitKey, now: Instant) -> Option<PitEntry> {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => self.entries.remove(key),
            _ => None,
        }
    }

    /// Forgets `face`; entries left without downstreams are removed and returned.
    pub fn remove_face(&mut self, face: FaceId) -> Vec<PitEntry> {
        for entry in self.entries.values_mut() {
            entry.in_records.remove(&face);
            entry.out_records.remove(&face);
        }
        let orphaned: Vec<PitKey> = self
            .entries
            .values()
            .filter(|entry| entry.in_records.is_empty())
            .map(|entry| entry.key.clone())
            .collect();
        orphaned
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &PitEntry> {
        self.entries.values()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
