//! Two-node ping demo for the ndn-sim CLI

use anyhow::{Context, Result};
use log::info;
use ndn_sim_common::ndn::{Interest, Name};
use ndn_sim_forwarder::{LinkParams, Network, NetworkConfig, PingServer, RouteOptions};
use std::time::Duration;
use tokio::time::Instant;

use crate::utils::{format_duration, print_header};

/// Ping results
#[derive(Debug, Clone, Default)]
struct PingResults {
    sent: u32,
    received: u32,
    min_rtt: Option<Duration>,
    max_rtt: Option<Duration>,
    total_rtt: Duration,
}

impl PingResults {
    fn record(&mut self, rtt: Duration) {
        self.received += 1;
        self.total_rtt += rtt;
        self.min_rtt = Some(self.min_rtt.map_or(rtt, |m| m.min(rtt)));
        self.max_rtt = Some(self.max_rtt.map_or(rtt, |m| m.max(rtt)));
    }

    fn average(&self) -> Option<Duration> {
        (self.received > 0).then(|| self.total_rtt / self.received)
    }
}

/// Ping node "b" from node "a" over one simulated link
pub async fn run_ping(latency_ms: u64, loss: f64, count: u32, timeout_ms: u64, seed: u64) -> Result<()> {
    info!(
        "Running ping: latency={}ms, loss={}, count={}",
        latency_ms, loss, count
    );

    let mut network = Network::new(NetworkConfig {
        seed,
        ..Default::default()
    })?;
    network.add_node("a")?;
    let server = network.add_node("b")?;

    let prefix = Name::from("/b");
    PingServer::register(&server, &prefix).await?;
    let link = network
        .connect("a", "b", LinkParams::new(latency_ms, loss))
        .await
        .context("Failed to create link")?;
    network
        .add_route("a", &prefix, link, RouteOptions::default())
        .await?;

    let client = network
        .node("a")
        .cloned()
        .context("node a disappeared")?;

    println!("PING {} ({} ms, loss {})", PingServer::prefix(&prefix), latency_ms, loss);
    let mut results = PingResults::default();
    for seq in 0..count {
        let name = PingServer::prefix(&prefix).append(seq.to_string());
        let interest = Interest::new(name.clone())
            .with_must_be_fresh(true)
            .with_lifetime(Duration::from_millis(timeout_ms));

        results.sent += 1;
        let start = Instant::now();
        match client.express_interest(interest).await {
            Ok(_) => {
                let rtt = start.elapsed();
                results.record(rtt);
                println!("Data from {}: seq={} time={}", name, seq, format_duration(rtt));
            }
            Err(e) => println!("{}: seq={} {}", name, seq, e),
        }
    }

    print_header("Ping statistics");
    println!(
        "{} Interests sent, {} Data received, {:.1}% lost",
        results.sent,
        results.received,
        if results.sent == 0 {
            0.0
        } else {
            (results.sent - results.received) as f64 / results.sent as f64 * 100.0
        }
    );
    if let (Some(min), Some(avg), Some(max)) = (results.min_rtt, results.average(), results.max_rtt) {
        println!(
            "rtt min/avg/max = {}/{}/{}",
            format_duration(min),
            format_duration(avg),
            format_duration(max)
        );
    }

    network.shutdown().await;
    Ok(())
}
