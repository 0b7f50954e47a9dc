//! Dead Nonce List (DNL).
//!
//! Remembers (name, nonce) pairs for a fixed retention window after their PIT
//! entry is gone, so a late duplicate cannot trigger a fresh forwarding
//! decision in a cyclic topology.

use ndn_sim_common::ndn::Name;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct DeadNonceList {
    retention: Duration,
    entries: HashMap<(Name, u32), Instant>,
    /// Insertion order; with a fixed retention this is also expiry order
    queue: VecDeque<(Instant, Name, u32)>,
}

impl DeadNonceList {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            entries: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records the pair unless it is already present.
    ///
    /// Returns `false` when the pair was already recorded, i.e. a duplicate.
    pub fn record_if_new(&mut self, name: &Name, nonce: u32, now: Instant) -> bool {
        self.purge(now);
        let key = (name.clone(), nonce);
        if self.entries.contains_key(&key) {
            return false;
        }
        let expires_at = now + self.retention;
        self.entries.insert(key, expires_at);
        self.queue.push_back((expires_at, name.clone(), nonce));
        true
    }

    /// Checks for the pair without recording it.
    pub fn contains(&mut self, name: &Name, nonce: u32, now: Instant) -> bool {
        self.purge(now);
        self.entries.contains_key(&(name.clone(), nonce))
    }

    fn purge(&mut self, now: Instant) {
        while let Some((expires_at, _, _)) = self.queue.front() {
            if *expires_at > now {
                break;
            }
            if let Some((_, name, nonce)) = self.queue.pop_front() {
                self.entries.remove(&(name, nonce));
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.queue.clear();
    }
}
