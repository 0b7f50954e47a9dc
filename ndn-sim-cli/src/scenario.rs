//! Scenario files.
//!
//! A scenario describes a topology (nodes and links), its routes and
//! producers, and the Interests to express. Any format the `config` crate
//! understands works; `NDNSIM_` environment variables override file values
//! (e.g. `NDNSIM_NETWORK__LATENCY_SLOWDOWN=2`).

use anyhow::{bail, Context, Result};
use ndn_sim_forwarder::{LinkParams, NetworkConfig, RouteOptions, Strategy};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub network: NetworkConfig,
    pub nodes: Vec<NodeSpec>,
    pub links: Vec<LinkSpec>,
    pub strategies: Vec<StrategySpec>,
    pub routes: Vec<RouteSpec>,
    pub producers: Vec<ProducerSpec>,
    pub interests: Vec<InterestSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    /// Register a ping responder under `/<name>/ping`
    #[serde(default)]
    pub ping: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkSpec {
    pub a: String,
    pub b: String,
    #[serde(flatten)]
    pub params: LinkParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategySpec {
    pub node: String,
    pub prefix: String,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    pub node: String,
    pub prefix: String,
    /// Neighbor the route points at
    pub via: String,
    #[serde(flatten)]
    pub options: RouteOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProducerSpec {
    pub node: String,
    pub prefix: String,
    #[serde(default)]
    pub content: String,
    pub freshness_ms: Option<u64>,
    /// Leave Interests unanswered
    #[serde(default)]
    pub silent: bool,
    #[serde(default)]
    pub cache: bool,
    #[serde(default = "default_capture")]
    pub capture: bool,
}

fn default_capture() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterestSpec {
    pub node: String,
    pub name: String,
    /// Delay before the Interest is expressed
    #[serde(default)]
    pub at_ms: u64,
    #[serde(default = "default_lifetime")]
    pub lifetime_ms: u64,
    #[serde(default)]
    pub can_be_prefix: bool,
    #[serde(default)]
    pub must_be_fresh: bool,
    /// Retransmissions after a timeout
    #[serde(default)]
    pub retx: u32,
    #[serde(default)]
    pub retx_backoff_ms: u64,
}

fn default_lifetime() -> u64 {
    ndn_sim_common::types::DEFAULT_INTEREST_LIFETIME.as_millis() as u64
}

impl Scenario {
    /// Loads a scenario file, layered with `NDNSIM_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("NDNSIM").separator("__"))
            .build()
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let scenario: Scenario = settings
            .try_deserialize()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Checks that every reference names a declared node.
    pub fn validate(&self) -> Result<()> {
        let mut names = BTreeSet::new();
        for node in &self.nodes {
            if !names.insert(node.name.as_str()) {
                bail!("node {} is declared twice", node.name);
            }
        }

        let known = |node: &str, what: &str| -> Result<()> {
            if names.contains(node) {
                Ok(())
            } else {
                bail!("{} refers to unknown node {}", what, node)
            }
        };
        for link in &self.links {
            known(&link.a, "link")?;
            known(&link.b, "link")?;
        }
        for strategy in &self.strategies {
            known(&strategy.node, "strategy")?;
        }
        for route in &self.routes {
            known(&route.node, "route")?;
            known(&route.via, "route")?;
        }
        for producer in &self.producers {
            known(&producer.node, "producer")?;
        }
        for interest in &self.interests {
            known(&interest.node, "interest")?;
        }
        Ok(())
    }
}
