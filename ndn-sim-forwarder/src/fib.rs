//! FIB (Forwarding Information Base) operations.
//!
//! This module handles the Forwarding Information Base, which maps name
//! prefixes to next-hop faces. Each prefix appears at most once; lookups
//! compare names component by component.

use log::{debug, info};
use ndn_sim_common::ndn::Name;
use ndn_sim_common::types::FaceId;
use ndn_sim_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::strategy::Strategy;

/// Options attached to one route registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Route cost/metric; lower is preferred
    pub cost: u32,

    /// A capturing prefix hides shorter matching prefixes from the strategy
    pub capture: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            cost: 0,
            capture: true,
        }
    }
}

/// Next hop information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHop {
    pub face: FaceId,
    pub cost: u32,
}

/// FIB entry containing next hop information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibEntry {
    /// Name prefix this entry covers
    pub prefix: Name,
    /// Next hops, sorted by ascending cost
    pub next_hops: Vec<NextHop>,
    /// Strategy used for Interests whose longest match is this entry
    pub strategy: Strategy,
    pub capture: bool,
}

impl FibEntry {
    fn new(prefix: Name, capture: bool) -> Self {
        Self {
            prefix,
            next_hops: Vec::new(),
            strategy: Strategy::default(),
            capture,
        }
    }

    /// Entries that only carry the default strategy disappear with their last next hop.
    fn is_removable(&self) -> bool {
        self.next_hops.is_empty() && self.strategy == Strategy::default()
    }
}

/// Forwarding Information Base for one forwarder
#[derive(Debug, Default)]
pub struct Fib {
    entries: BTreeMap<Name, FibEntry>,
}

impl Fib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fails when `prefix` already carries routes with a different capture setting.
    pub fn check_registration(&self, prefix: &Name, capture: bool) -> Result<()> {
        match self.entries.get(prefix) {
            Some(entry) if !entry.next_hops.is_empty() && entry.capture != capture => {
                Err(Error::ConflictingRegistration {
                    prefix: prefix.clone(),
                    detail: format!(
                        "existing routes use capture={}, new route uses capture={}",
                        entry.capture, capture
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    /// Adds `face` as a next hop for `prefix`, or updates its cost.
    pub fn register(&mut self, prefix: &Name, face: FaceId, opts: RouteOptions) -> Result<()> {
        self.check_registration(prefix, opts.capture)?;

        let entry = self
            .entries
            .entry(prefix.clone())
            .or_insert_with(|| FibEntry::new(prefix.clone(), opts.capture));
        if entry.next_hops.is_empty() {
            entry.capture = opts.capture;
        }

        match entry.next_hops.iter_mut().find(|hop| hop.face == face) {
            Some(hop) => hop.cost = opts.cost,
            None => entry.next_hops.push(NextHop {
                face,
                cost: opts.cost,
            }),
        }
        entry.next_hops.sort_by_key(|hop| hop.cost);

        info!("Added FIB route {} -> {} (cost {})", prefix, face, opts.cost);
        Ok(())
    }

    /// Removes `face` from `prefix`. Returns true if a route was removed.
    pub fn unregister(&mut self, prefix: &Name, face: FaceId) -> bool {
        let Some(entry) = self.entries.get_mut(prefix) else {
            return false;
        };
        let before = entry.next_hops.len();
        entry.next_hops.retain(|hop| hop.face != face);
        let removed = entry.next_hops.len() != before;
        if entry.is_removable() {
            self.entries.remove(prefix);
        }
        if removed {
            info!("Removed FIB route {} -> {}", prefix, face);
        }
        removed
    }

    /// Drops every route through `face`; returns how many were removed.
    pub fn remove_face(&mut self, face: FaceId) -> usize {
        let mut removed = 0;
        for entry in self.entries.values_mut() {
            let before = entry.next_hops.len();
            entry.next_hops.retain(|hop| hop.face != face);
            removed += before - entry.next_hops.len();
        }
        self.entries.retain(|_, entry| !entry.is_removable());
        if removed > 0 {
            debug!("Removed {} FIB routes through {}", removed, face);
        }
        removed
    }

    /// Selects the forwarding strategy for `prefix`, creating the entry if needed.
    pub fn set_strategy(&mut self, prefix: &Name, strategy: Strategy) {
        let entry = self
            .entries
            .entry(prefix.clone())
            .or_insert_with(|| FibEntry::new(prefix.clone(), true));
        entry.strategy = strategy;
        if entry.is_removable() {
            self.entries.remove(prefix);
        }
        info!("Strategy for {} set to {}", prefix, strategy);
    }

    /// Returns the entry for exactly `prefix`.
    pub fn get(&self, prefix: &Name) -> Option<&FibEntry> {
        self.entries.get(prefix)
    }

    /// Longest registered prefix of `name` that has at least one next hop.
    pub fn longest_match(&self, name: &Name) -> Option<&FibEntry> {
        (0..=name.len())
            .rev()
            .filter_map(|len| self.entries.get(&name.prefix(len)))
            .find(|entry| !entry.next_hops.is_empty())
    }

    /// Every registered prefix of `name`, longest first.
    pub fn all_matches(&self, name: &Name) -> Vec<&FibEntry> {
        (0..=name.len())
            .rev()
            .filter_map(|len| self.entries.get(&name.prefix(len)))
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &FibEntry> {
        self.entries.values()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Display for Fib {
    /// One line per prefix, as shown by the inspection UI.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.entries.values() {
            let hops: Vec<String> = entry
                .next_hops
                .iter()
                .map(|hop| format!("{}(cost={})", hop.face.0, hop.cost))
                .collect();
            writeln!(
                f,
                "{} nexthops={{{}}} strategy={}{}",
                entry.prefix,
                hops.join(", "),
                entry.strategy,
                if entry.capture { " capture" } else { "" }
            )?;
        }
        Ok(())
    }
}
