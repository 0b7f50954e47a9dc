//! Consumer-side retransmission.
//!
//! The forwarder never retransmits on its own. [`Consumer`] re-expresses an
//! Interest with a fresh nonce after a timeout, up to a fixed count. A Nack
//! is final and is returned immediately.

use log::debug;
use ndn_sim_common::ndn::{Data, Interest};
use ndn_sim_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::forwarder::Forwarder;

/// Retransmission policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetxPolicy {
    /// Number of retransmissions after the first attempt
    pub count: u32,

    /// Wait before the n-th retransmission is n times this (in milliseconds)
    pub backoff_ms: u64,
}

impl RetxPolicy {
    pub fn new(count: u32, backoff: Duration) -> Self {
        Self {
            count,
            backoff_ms: backoff.as_millis() as u64,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(attempt as u64))
    }
}

/// Expresses Interests on a forwarder's application face with retransmission
#[derive(Debug, Clone)]
pub struct Consumer {
    forwarder: Forwarder,
    policy: RetxPolicy,
}

impl Consumer {
    pub fn new(forwarder: Forwarder, policy: RetxPolicy) -> Self {
        Self { forwarder, policy }
    }

    pub fn policy(&self) -> RetxPolicy {
        self.policy
    }

    pub async fn express(&self, interest: Interest) -> Result<Data> {
        let mut interest = interest;
        let mut attempt = 0;
        loop {
            match self.forwarder.express_interest(interest.clone()).await {
                Err(Error::Timeout(name)) if attempt < self.policy.count => {
                    attempt += 1;
                    debug!(
                        "[Node {}] Retransmitting {} ({}/{})",
                        self.forwarder.name(),
                        name,
                        attempt,
                        self.policy.count
                    );
                    tokio::time::sleep(self.policy.backoff(attempt)).await;
                    interest = interest.with_nonce(rand::random());
                }
                outcome => return outcome,
            }
        }
    }
}
