//! Configuration for simulated forwarders and networks.
//!
//! Both structures deserialize with per-field defaults, so a scenario file
//! only needs to name the knobs it changes.

use ndn_sim_common::types::{
    DEFAULT_CS_CAPACITY, DEFAULT_DNL_RETENTION, DEFAULT_EVENT_BUFFER, DEFAULT_PIT_SWEEP_INTERVAL,
};
use ndn_sim_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Forwarder configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Maximum number of Data packets kept in the Content Store (0 disables caching)
    pub cs_capacity: usize,

    /// How long a (name, nonce) pair stays in the Dead Nonce List (in milliseconds)
    pub dnl_retention_ms: u64,

    /// Period of the PIT expiry sweep (in milliseconds)
    pub pit_sweep_interval_ms: u64,

    /// Whether Data that satisfied a PIT entry is cached
    pub cache_forwarded: bool,

    /// Capacity of the observer broadcast channel
    pub event_buffer_size: usize,

    /// Seed for link-loss decisions; `None` draws one from entropy
    pub seed: Option<u64>,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            cs_capacity: DEFAULT_CS_CAPACITY,
            dnl_retention_ms: DEFAULT_DNL_RETENTION.as_millis() as u64,
            pit_sweep_interval_ms: DEFAULT_PIT_SWEEP_INTERVAL.as_millis() as u64,
            cache_forwarded: true,
            event_buffer_size: DEFAULT_EVENT_BUFFER,
            seed: None,
        }
    }
}

impl ForwarderConfig {
    pub fn dnl_retention(&self) -> Duration {
        Duration::from_millis(self.dnl_retention_ms)
    }

    pub fn pit_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.pit_sweep_interval_ms)
    }

    /// Rejects values the forwarder cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pit_sweep_interval_ms == 0 {
            return Err(Error::Config("pit_sweep_interval_ms must be positive".into()));
        }
        if self.event_buffer_size == 0 {
            return Err(Error::Config("event_buffer_size must be positive".into()));
        }
        Ok(())
    }
}

/// Network-wide knobs owned by the topology layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Multiplier applied to every link latency to slow the animation down
    pub latency_slowdown: f64,

    /// Content Store size given to every node
    pub cs_capacity: usize,

    /// Dead Nonce List retention given to every node (in milliseconds)
    pub dnl_retention_ms: u64,

    /// PIT sweep period given to every node (in milliseconds)
    pub pit_sweep_interval_ms: u64,

    /// Whether nodes cache forwarded Data
    pub cache_forwarded: bool,

    /// Whether connections record capture events
    pub capture: bool,

    /// Base seed; node `i` uses `seed + i`
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let forwarder = ForwarderConfig::default();
        Self {
            latency_slowdown: 1.0,
            cs_capacity: forwarder.cs_capacity,
            dnl_retention_ms: forwarder.dnl_retention_ms,
            pit_sweep_interval_ms: forwarder.pit_sweep_interval_ms,
            cache_forwarded: forwarder.cache_forwarded,
            capture: true,
            seed: 0,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        validate_slowdown(self.latency_slowdown)?;
        self.forwarder_config(0).validate()
    }

    /// Derives the configuration of the `index`-th node.
    pub fn forwarder_config(&self, index: u64) -> ForwarderConfig {
        ForwarderConfig {
            cs_capacity: self.cs_capacity,
            dnl_retention_ms: self.dnl_retention_ms,
            pit_sweep_interval_ms: self.pit_sweep_interval_ms,
            cache_forwarded: self.cache_forwarded,
            seed: Some(self.seed.wrapping_add(index)),
            ..ForwarderConfig::default()
        }
    }
}

pub(crate) fn validate_slowdown(slowdown: f64) -> Result<()> {
    if !slowdown.is_finite() || slowdown < 0.0 {
        return Err(Error::Config(format!(
            "latency_slowdown must be a non-negative number, got {}",
            slowdown
        )));
    }
    Ok(())
}
