//! Forwarding strategies.
//!
//! A strategy turns the next hops gathered from the FIB into the set of
//! faces an Interest is actually sent on. Strategies are selected per
//! prefix and are pure functions of their inputs.

use ndn_sim_common::ndn::Name;
use ndn_sim_common::types::FaceId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fib::{FibEntry, NextHop};

/// Forwarding strategy attached to a FIB prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Forward on the single cheapest next hop
    #[default]
    BestRoute,

    /// Forward on every next hop
    Multicast,

    /// Like best-route, but flood link faces when no route is known and
    /// learn a route from the face the Data comes back on
    SelfLearning,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::BestRoute => write!(f, "best-route"),
            Strategy::Multicast => write!(f, "multicast"),
            Strategy::SelfLearning => write!(f, "self-learning"),
        }
    }
}

/// Next hops gathered from the FIB for one Interest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates {
    /// Strategy of the longest matching entry
    pub strategy: Strategy,
    /// Prefix of the longest matching entry
    pub prefix: Name,
    /// Next hops, longest prefix first
    pub hops: Vec<NextHop>,
}

/// Merges the next hops of `matches` (longest first), stopping after the
/// first capturing entry that contributed hops.
pub fn collect_candidates(matches: &[&FibEntry]) -> Option<Candidates> {
    let first = matches.first()?;
    let mut hops: Vec<NextHop> = Vec::new();

    for entry in matches {
        for hop in &entry.next_hops {
            if !hops.iter().any(|known| known.face == hop.face) {
                hops.push(*hop);
            }
        }
        if entry.capture && !entry.next_hops.is_empty() {
            break;
        }
    }

    Some(Candidates {
        strategy: first.strategy,
        prefix: first.prefix.clone(),
        hops,
    })
}

/// Faces chosen for one Interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub faces: Vec<FaceId>,
    /// Set when the Interest was flooded and a route should be learned from the reply
    pub learn: bool,
}

impl Strategy {
    /// Chooses outgoing faces. The incoming face is never selected.
    ///
    /// `links` lists every link face of the node and is only consulted by
    /// [`Strategy::SelfLearning`] when no usable route exists.
    pub fn select(&self, hops: &[NextHop], in_face: FaceId, links: &[FaceId]) -> Decision {
        let mut usable = hops.iter().filter(|hop| hop.face != in_face);
        match self {
            Strategy::BestRoute => Decision {
                faces: best(usable),
                learn: false,
            },
            Strategy::Multicast => Decision {
                faces: usable.map(|hop| hop.face).collect(),
                learn: false,
            },
            Strategy::SelfLearning => {
                let faces = best(&mut usable);
                if !faces.is_empty() {
                    return Decision { faces, learn: false };
                }
                Decision {
                    faces: links.iter().copied().filter(|f| *f != in_face).collect(),
                    learn: true,
                }
            }
        }
    }
}

/// Cheapest hop; ties go to the earliest, i.e. the longest prefix.
fn best<'a>(hops: impl Iterator<Item = &'a NextHop>) -> Vec<FaceId> {
    hops.min_by_key(|hop| hop.cost)
        .map(|hop| vec![hop.face])
        .unwrap_or_default()
}
