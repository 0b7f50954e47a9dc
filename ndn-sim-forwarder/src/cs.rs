//! Content Store (CS) operations.
//!
//! This module handles the Content Store, which caches Data packets to
//! satisfy future matching Interests before any forwarding decision is made.
//!
//! The store is bounded by entry count. Entries past their freshness are
//! purged opportunistically on every lookup and insert; when the store is
//! still over capacity the oldest insertion is evicted first.

use log::trace;
use ndn_sim_common::ndn::{Data, Interest, Name};
use std::collections::{BTreeMap, VecDeque};
use tokio::time::Instant;

/// A cached Data packet.
#[derive(Debug, Clone)]
pub struct CsEntry {
    pub data: Data,
    pub inserted_at: Instant,
    pub fresh_until: Instant,
    seq: u64,
}

impl CsEntry {
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.fresh_until > now
    }
}

/// Bounded FIFO cache of Data keyed by full name.
#[derive(Debug)]
pub struct ContentStore {
    capacity: usize,
    entries: BTreeMap<Name, CsEntry>,
    /// Insertion order; stale `(seq, name)` pairs left by overwrites are skipped
    order: VecDeque<(u64, Name)>,
    next_seq: u64,
}

impl ContentStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: BTreeMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds cached Data able to satisfy `interest`.
    ///
    /// Expired entries are purged before matching, so every remaining entry
    /// is fresh and MustBeFresh needs no separate check. Data stored without
    /// a FreshnessPeriod is therefore never served. With CanBePrefix the
    /// longest matching name wins.
    pub fn lookup(&mut self, interest: &Interest, now: Instant) -> Option<Data> {
        self.purge_expired(now);

        if !interest.can_be_prefix {
            return self.entries.get(&interest.name).map(|entry| entry.data.clone());
        }

        // Every extension of the Interest name sorts right after it
        self.entries
            .range(interest.name.clone()..)
            .take_while(|(name, _)| interest.name.is_prefix_of(name))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, entry)| entry.data.clone())
    }

    /// Stores `data`, replacing any entry with the same name.
    ///
    /// Returns the number of entries evicted to stay within capacity.
    pub fn insert(&mut self, data: Data, now: Instant) -> usize {
        if self.capacity == 0 {
            return 0;
        }

        let mut evicted = self.purge_expired(now);

        let seq = self.next_seq;
        self.next_seq += 1;
        let name = data.name.clone();
        let fresh_until = now + data.freshness_period.unwrap_or_default();
        trace!("CS insert {} (seq {})", name, seq);

        self.entries.insert(
            name.clone(),
            CsEntry {
                data,
                inserted_at: now,
                fresh_until,
                seq,
            },
        );
        self.order.push_back((seq, name));

        while self.entries.len() > self.capacity {
            let Some((old_seq, old_name)) = self.order.pop_front() else {
                break;
            };
            if self.entries.get(&old_name).map(|e| e.seq) == Some(old_seq) {
                trace!("CS evict {}", old_name);
                self.entries.remove(&old_name);
                evicted += 1;
            }
        }

        if self.order.len() > 2 * self.capacity {
            let entries = &self.entries;
            self.order
                .retain(|(seq, name)| entries.get(name).map(|e| e.seq) == Some(*seq));
        }

        evicted
    }

    /// Removes entries whose freshness has elapsed.
    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        before - self.entries.len()
    }

    /// Iterates cached entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = &CsEntry> {
        self.entries.values()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fresh(name: &str) -> Data {
        Data::new(name, name.to_string()).with_freshness(Duration::from_secs(10))
    }

    #[test]
    fn test_exact_lookup() {
        let now = Instant::now();
        let mut cs = ContentStore::new(10);
        cs.insert(fresh("/x"), now);

        assert_eq!(cs.lookup(&Interest::new("/x"), now).unwrap().name, Name::from("/x"));
        assert!(cs.lookup(&Interest::new("/x/y"), now).is_none());
        // Exact match does not extend to longer names without CanBePrefix
        cs.insert(fresh("/p/q"), now);
        assert!(cs.lookup(&Interest::new("/p"), now).is_none());
    }

    #[test]
    fn test_prefix_lookup_prefers_longest() {
        let now = Instant::now();
        let mut cs = ContentStore::new(10);
        cs.insert(fresh("/a/b"), now);
        cs.insert(fresh("/a/b/c/d"), now);
        cs.insert(fresh("/a/bb/c/d/e"), now);
        cs.insert(fresh("/z"), now);

        let interest = Interest::new("/a/b").with_can_be_prefix(true);
        let data = cs.lookup(&interest, now).unwrap();
        assert_eq!(data.name, Name::from("/a/b/c/d"));
    }

    #[test]
    fn test_expired_entries_are_purged() {
        let now = Instant::now();
        let mut cs = ContentStore::new(10);
        cs.insert(Data::new("/s", "").with_freshness(Duration::from_millis(100)), now);
        cs.insert(fresh("/f"), now);

        let interest = Interest::new("/s").with_must_be_fresh(true);
        assert!(cs.lookup(&interest, now + Duration::from_millis(50)).is_some());
        assert!(cs.lookup(&interest, now + Duration::from_millis(150)).is_none());
        assert_eq!(cs.len(), 1);

        // Data without a freshness period never survives past insertion
        cs.insert(Data::new("/never", ""), now);
        assert!(cs.lookup(&Interest::new("/never"), now).is_none());
    }

    #[test]
    fn test_stale_entry_serves_no_interest_kind() {
        let now = Instant::now();
        let later = now + Duration::from_millis(200);
        let mut cs = ContentStore::new(10);

        for must_be_fresh in [false, true] {
            cs.insert(Data::new("/v/1", "").with_freshness(Duration::from_millis(100)), now);
            let exact = Interest::new("/v/1").with_must_be_fresh(must_be_fresh);
            let prefix = Interest::new("/v")
                .with_can_be_prefix(true)
                .with_must_be_fresh(must_be_fresh);
            assert!(cs.lookup(&exact, now).is_some());
            assert!(cs.lookup(&prefix, now).is_some());
            assert!(cs.lookup(&exact, later).is_none());
            assert!(cs.lookup(&prefix, later).is_none());
            assert!(cs.is_empty());
        }
    }

    #[test]
    fn test_fifo_eviction() {
        let now = Instant::now();
        let mut cs = ContentStore::new(2);
        assert_eq!(cs.insert(fresh("/1"), now), 0);
        assert_eq!(cs.insert(fresh("/2"), now), 0);
        assert_eq!(cs.insert(fresh("/3"), now), 1);

        assert_eq!(cs.len(), 2);
        assert!(cs.lookup(&Interest::new("/1"), now).is_none());
        assert!(cs.lookup(&Interest::new("/2"), now).is_some());
        assert!(cs.lookup(&Interest::new("/3"), now).is_some());
    }

    #[test]
    fn test_reinsert_overwrites() {
        let now = Instant::now();
        let mut cs = ContentStore::new(2);
        cs.insert(fresh("/1"), now);
        cs.insert(fresh("/2"), now);
        cs.insert(Data::new("/1", "v2").with_freshness(Duration::from_secs(10)), now);
        assert_eq!(cs.len(), 2);

        // "/1" was re-inserted last, so "/2" is now the oldest
        cs.insert(fresh("/3"), now);
        assert!(cs.lookup(&Interest::new("/2"), now).is_none());
        assert_eq!(cs.lookup(&Interest::new("/1"), now).unwrap().content.as_ref(), b"v2");
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let now = Instant::now();
        let mut cs = ContentStore::new(0);
        cs.insert(fresh("/x"), now);
        assert!(cs.is_empty());
    }
}
