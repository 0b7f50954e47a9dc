//! Scenario runner for the ndn-sim CLI

use anyhow::{Context, Result};
use futures::future::join_all;
use log::{debug, info};
use ndn_sim_common::ndn::{Data, Interest, Name};
use ndn_sim_common::Error;
use ndn_sim_forwarder::{Consumer, FnProducer, Network, PingServer, ProducerOptions, RetxPolicy};
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::scenario::{ProducerSpec, Scenario};
use crate::utils::{format_bytes, format_duration, print_header};

/// What to print besides the Interest results
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub captures: bool,
    pub stats: bool,
    pub fib: bool,
}

/// Outcome of one scheduled Interest
#[derive(Debug)]
struct InterestReport {
    node: String,
    name: Name,
    elapsed: Duration,
    outcome: Result<Data, Error>,
}

/// Load and run a scenario file
pub async fn run_scenario(path: &Path, options: RunOptions) -> Result<()> {
    let scenario = Scenario::load(path)?;
    info!(
        "Running scenario {}: {} nodes, {} links, {} Interests",
        path.display(),
        scenario.nodes.len(),
        scenario.links.len(),
        scenario.interests.len()
    );

    let mut network = build_network(&scenario).await?;
    let reports = express_all(&network, &scenario).await?;

    print_header("Interests");
    let mut satisfied = 0;
    for report in &reports {
        match &report.outcome {
            Ok(data) => {
                satisfied += 1;
                println!(
                    "  [{}] {} -> Data {} ({}) in {}",
                    report.node,
                    report.name,
                    data.name,
                    format_bytes(data.content.len() as u64),
                    format_duration(report.elapsed)
                );
            }
            Err(e) => println!(
                "  [{}] {} -> {} after {}",
                report.node,
                report.name,
                e,
                format_duration(report.elapsed)
            ),
        }
    }
    println!("Satisfied: {}/{}", satisfied, reports.len());

    print_header("Traffic");
    for stats in network.connection_stats() {
        println!(
            "  {} {} <-> {}: {} packets ({}) / {} packets ({}), lost {}",
            stats.id,
            stats.node_a,
            stats.node_b,
            stats.a_to_b.sent_packets,
            format_bytes(stats.a_to_b.sent_bytes),
            stats.b_to_a.sent_packets,
            format_bytes(stats.b_to_a.sent_bytes),
            stats.a_to_b.lost_packets + stats.b_to_a.lost_packets
        );
    }
    if let Some(busiest) = network.busiest_connection() {
        println!("Busiest connection: {} ({} packets)", busiest.id, busiest.total_packets());
    }
    if let Some(busiest) = network.busiest_node() {
        println!("Busiest node: {} ({} packets)", busiest.node, busiest.total());
    }

    if options.stats {
        print_header("Counters");
        for forwarder in network.nodes() {
            let snapshot = forwarder.metrics().snapshot();
            println!("{}: {}", forwarder.name(), serde_json::to_string_pretty(&snapshot)?);
        }
    }

    if options.fib {
        print_header("FIB");
        for (node, fib) in network.fib_states().await {
            println!("{}:", node);
            for line in fib.lines() {
                println!("  {}", line);
            }
        }
    }

    if options.captures {
        print_header("Captures");
        for event in network.drain_captures() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    network.shutdown().await;
    Ok(())
}

async fn build_network(scenario: &Scenario) -> Result<Network> {
    let mut network = Network::new(scenario.network.clone()).context("Invalid network settings")?;

    for node in &scenario.nodes {
        let forwarder = network.add_node(&node.name)?;
        if node.ping {
            PingServer::register(&forwarder, &Name::new().append(node.name.clone())).await?;
        }
    }

    for link in &scenario.links {
        network
            .connect(&link.a, &link.b, link.params)
            .await
            .with_context(|| format!("Failed to connect {} and {}", link.a, link.b))?;
    }

    for spec in &scenario.strategies {
        let prefix = parse_name(&spec.prefix)?;
        if let Some(forwarder) = network.node(&spec.node) {
            forwarder.set_strategy(&prefix, spec.strategy).await;
        }
    }

    for route in &scenario.routes {
        let prefix = parse_name(&route.prefix)?;
        network
            .add_route_via(&route.node, &prefix, &route.via, route.options)
            .await
            .with_context(|| format!("Failed to add route {} on {}", route.prefix, route.node))?;
    }

    for spec in &scenario.producers {
        register_producer(&network, spec).await?;
    }

    Ok(network)
}

async fn register_producer(network: &Network, spec: &ProducerSpec) -> Result<()> {
    let Some(forwarder) = network.node(&spec.node) else {
        return Ok(());
    };
    let prefix = parse_name(&spec.prefix)?;
    let content = bytes::Bytes::from(spec.content.clone());
    let freshness = spec.freshness_ms.map(Duration::from_millis);
    let silent = spec.silent;

    let producer = FnProducer::new(move |interest: Interest| {
        let content = content.clone();
        async move {
            if silent {
                return None;
            }
            let data = Data::new(interest.name, content);
            Some(match freshness {
                Some(freshness) => data.with_freshness(freshness),
                None => data,
            })
        }
    });
    let options = ProducerOptions {
        capture: spec.capture,
        cache: spec.cache,
    };
    forwarder
        .register_prefix(prefix, producer, options)
        .await
        .with_context(|| format!("Failed to register {} on {}", spec.prefix, spec.node))?;
    debug!("Producer {} registered on {}", spec.prefix, spec.node);
    Ok(())
}

async fn express_all(network: &Network, scenario: &Scenario) -> Result<Vec<InterestReport>> {
    let mut tasks = Vec::new();
    for spec in &scenario.interests {
        let Some(forwarder) = network.node(&spec.node) else {
            continue;
        };
        let name = parse_name(&spec.name)?;
        let interest = Interest::new(name.clone())
            .with_lifetime(Duration::from_millis(spec.lifetime_ms))
            .with_can_be_prefix(spec.can_be_prefix)
            .with_must_be_fresh(spec.must_be_fresh);
        let consumer = Consumer::new(
            forwarder.clone(),
            RetxPolicy::new(spec.retx, Duration::from_millis(spec.retx_backoff_ms)),
        );
        let node = spec.node.clone();
        let at = Duration::from_millis(spec.at_ms);

        tasks.push(tokio::spawn(async move {
            sleep(at).await;
            let start = Instant::now();
            let outcome = consumer.express(interest).await;
            InterestReport {
                node,
                name,
                elapsed: start.elapsed(),
                outcome,
            }
        }));
    }

    let mut reports = Vec::new();
    for joined in join_all(tasks).await {
        reports.push(joined.context("Interest task panicked")?);
    }
    Ok(reports)
}

fn parse_name(uri: &str) -> Result<Name> {
    uri.parse::<Name>()
        .with_context(|| format!("Invalid NDN name {:?}", uri))
}
