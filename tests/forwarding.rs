//! End-to-end forwarding behavior across simulated topologies.

use ndn_sim::forwarder::{ConnectionStats, FnProducer};
use ndn_sim::{
    Data, Error, ForwarderEvent, Interest, LinkParams, NackReason, Name, Network, NetworkConfig, PingServer,
    ProducerOptions, RouteOptions, Strategy,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn network() -> Network {
    Network::new(NetworkConfig {
        seed: 1,
        ..Default::default()
    })
    .unwrap()
}

fn stats(net: &Network, a: &str, b: &str) -> ConnectionStats {
    net.connection_between(a, b).unwrap().stats()
}

async fn producer(net: &Network, node: &str, prefix: &str, content: &'static str) {
    net.node(node)
        .unwrap()
        .register_prefix(
            prefix,
            FnProducer::new(move |i: Interest| async move { Some(Data::new(i.name, content)) }),
            ProducerOptions::default(),
        )
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn ping_round_trip_takes_twice_the_latency() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    let b = net.add_node("b").unwrap();
    PingServer::register(&b, &Name::from("/b")).await.unwrap();
    let link = net.connect("a", "b", LinkParams::new(10, 0.0)).await.unwrap();
    net.add_route("a", &Name::from("/b"), link, RouteOptions::default())
        .await
        .unwrap();

    let start = Instant::now();
    let data = a.express_interest(Interest::new("/b/ping/1")).await.unwrap();
    let elapsed = start.elapsed();

    // Latency applies to each direction, so Interest plus Data cost 2 x 10ms
    assert_eq!(data.name, Name::from("/b/ping/1"));
    assert!(elapsed >= Duration::from_millis(20), "rtt {:?}", elapsed);
    assert!(elapsed <= Duration::from_millis(25), "rtt {:?}", elapsed);

    let s = stats(&net, "a", "b");
    assert_eq!(s.a_to_b.sent_packets, 1);
    assert_eq!(s.b_to_a.sent_packets, 1);
    assert_eq!(s.a_to_b.in_flight, 0);

    let captures = net.drain_captures();
    assert_eq!(captures.len(), 2);
    assert_eq!(captures[0].from_node, "a");
    assert_eq!(captures[1].from_node, "b");
    assert!(captures.iter().all(|c| c.size > 0 && !c.lost));
    assert_eq!(captures[1].timestamp_ms - captures[0].timestamp_ms, 10);
}

#[tokio::test(start_paused = true)]
async fn latency_slowdown_scales_delivery() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    let b = net.add_node("b").unwrap();
    PingServer::register(&b, &Name::from("/b")).await.unwrap();
    net.connect("a", "b", LinkParams::new(10, 0.0)).await.unwrap();
    net.add_route_via("a", &Name::from("/b"), "b", RouteOptions::default())
        .await
        .unwrap();
    net.set_latency_slowdown(2.0).unwrap();

    let start = Instant::now();
    a.express_interest(Interest::new("/b/ping/1")).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[tokio::test(start_paused = true)]
async fn empty_fib_is_nacked_not_timed_out() {
    let mut net = network();
    let a = net.add_node("a").unwrap();

    let start = Instant::now();
    let err = a.express_interest(Interest::new("/nowhere")).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Nacked {
            reason: NackReason::NoRoute,
            ..
        }
    ));
    assert!(start.elapsed() < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn concurrent_interests_are_aggregated() {
    let mut net = network();
    let c1 = net.add_node("c1").unwrap();
    let c2 = net.add_node("c2").unwrap();
    let router = net.add_node("r").unwrap();
    let p = net.add_node("p").unwrap();
    net.connect("c1", "r", LinkParams::new(10, 0.0)).await.unwrap();
    net.connect("c2", "r", LinkParams::new(10, 0.0)).await.unwrap();
    net.connect("r", "p", LinkParams::new(50, 0.0)).await.unwrap();
    for (node, via) in [("c1", "r"), ("c2", "r"), ("r", "p")] {
        net.add_route_via(node, &Name::from("/video"), via, RouteOptions::default())
            .await
            .unwrap();
    }

    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    p.register_prefix(
        "/video",
        FnProducer::new(move |i: Interest| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Some(Data::new(i.name, "frame")) }
        }),
        ProducerOptions::default(),
    )
    .await
    .unwrap();

    let (r1, r2) = tokio::join!(
        c1.express_interest(Interest::new("/video/seg/1")),
        c2.express_interest(Interest::new("/video/seg/1")),
    );
    assert_eq!(&r1.unwrap().content[..], b"frame");
    assert_eq!(&r2.unwrap().content[..], b"frame");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(router.metrics().interests_aggregated.value(), 1);
    assert_eq!(stats(&net, "r", "p").a_to_b.sent_packets, 1);
}

#[tokio::test(start_paused = true)]
async fn longest_prefix_wins() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    net.add_node("b").unwrap();
    net.add_node("c").unwrap();
    net.connect("a", "b", LinkParams::new(5, 0.0)).await.unwrap();
    net.connect("a", "c", LinkParams::new(5, 0.0)).await.unwrap();
    net.add_route_via("a", &Name::from("/a"), "b", RouteOptions::default())
        .await
        .unwrap();
    net.add_route_via("a", &Name::from("/a/b"), "c", RouteOptions::default())
        .await
        .unwrap();
    producer(&net, "b", "/a", "from-b").await;
    producer(&net, "c", "/a/b", "from-c").await;

    let data = a.express_interest(Interest::new("/a/b/c")).await.unwrap();
    assert_eq!(&data.content[..], b"from-c");
    assert_eq!(stats(&net, "a", "b").a_to_b.sent_packets, 0);
    assert_eq!(stats(&net, "a", "c").a_to_b.sent_packets, 1);

    let data = a.express_interest(Interest::new("/a/x")).await.unwrap();
    assert_eq!(&data.content[..], b"from-b");
}

#[tokio::test(start_paused = true)]
async fn content_store_short_circuits_forwarding() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    net.add_node("b").unwrap();
    net.connect("a", "b", LinkParams::new(5, 0.0)).await.unwrap();
    net.add_route_via("a", &Name::from("/x"), "b", RouteOptions::default())
        .await
        .unwrap();
    a.insert_into_cs(Data::new("/x", "cached").with_freshness(Duration::from_secs(10)))
        .await;

    let data = a.express_interest(Interest::new("/x")).await.unwrap();
    assert_eq!(&data.content[..], b"cached");
    assert_eq!(stats(&net, "a", "b").a_to_b.sent_packets, 0);
    assert_eq!(a.metrics().cs_hits.value(), 1);
}

#[tokio::test(start_paused = true)]
async fn replayed_nonce_is_dropped_silently() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    net.add_node("b").unwrap();
    net.connect("a", "b", LinkParams::new(5, 0.0)).await.unwrap();
    net.add_route_via("a", &Name::from("/l"), "b", RouteOptions::default())
        .await
        .unwrap();
    producer(&net, "b", "/l", "once").await;

    // Data without freshness never satisfies a must-be-fresh lookup from the CS
    let interest = Interest::new("/l")
        .with_nonce(42)
        .with_must_be_fresh(true)
        .with_lifetime(Duration::from_millis(100));
    a.express_interest(interest.clone()).await.unwrap();

    let err = a.express_interest(interest).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert_eq!(stats(&net, "a", "b").a_to_b.sent_packets, 1);
    assert_eq!(a.metrics().interests_looped.value(), 1);
}

#[tokio::test(start_paused = true)]
async fn unanswered_interest_times_out_and_leaves_no_pit_entry() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    let b = net.add_node("b").unwrap();
    net.connect("a", "b", LinkParams::new(10, 0.0)).await.unwrap();
    net.add_route_via("a", &Name::from("/void"), "b", RouteOptions::default())
        .await
        .unwrap();
    b.register_prefix(
        "/void",
        FnProducer::new(|_: Interest| async { None }),
        ProducerOptions::default(),
    )
    .await
    .unwrap();
    let mut events = b.subscribe();

    let start = Instant::now();
    let interest = Interest::new("/void/1").with_lifetime(Duration::from_millis(200));
    let err = a.express_interest(interest).await.unwrap_err();
    let elapsed = start.elapsed();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_millis(210));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(a.table_sizes().await.pit, 0);
    assert_eq!(b.table_sizes().await.pit, 0);

    let mut timed_out = false;
    while let Ok(event) = events.try_recv() {
        timed_out |= matches!(event, ForwarderEvent::InterestTimedOut { .. });
    }
    assert!(timed_out);
}

#[tokio::test(start_paused = true)]
async fn closing_a_link_drops_packets_in_flight() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    let b = net.add_node("b").unwrap();
    producer(&net, "b", "/far", "never").await;
    let link = net.connect("a", "b", LinkParams::new(50, 0.0)).await.unwrap();
    net.add_route("a", &Name::from("/far"), link, RouteOptions::default())
        .await
        .unwrap();
    let connection = net.connection(link).unwrap().clone();

    let consumer = a.clone();
    let pending = tokio::spawn(async move {
        let interest = Interest::new("/far/1").with_lifetime(Duration::from_millis(200));
        consumer.express_interest(interest).await
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(connection.stats().a_to_b.in_flight, 1);
    net.disconnect(link).await.unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The Interest never reached b
    assert_eq!(connection.stats().a_to_b.delivered_packets, 0);
    assert_eq!(b.metrics().packets_received.value(), 0);
    assert_eq!(b.metrics().interests_received.value(), 0);
    assert_eq!(a.table_sizes().await.pit, 0);
    assert_eq!(b.table_sizes().await.pit, 0);
}

#[tokio::test(start_paused = true)]
async fn total_loss_looks_like_a_timeout() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    let b = net.add_node("b").unwrap();
    PingServer::register(&b, &Name::from("/b")).await.unwrap();
    let link = net.connect("a", "b", LinkParams::new(5, 1.0)).await.unwrap();
    net.add_route("a", &Name::from("/b"), link, RouteOptions::default())
        .await
        .unwrap();

    let interest = Interest::new("/b/ping/1").with_lifetime(Duration::from_millis(100));
    assert!(matches!(a.express_interest(interest).await, Err(Error::Timeout(_))));
    let s = stats(&net, "a", "b");
    assert_eq!(s.a_to_b.lost_packets, 1);
    assert_eq!(s.a_to_b.delivered_packets, 0);
    assert!(net.drain_captures()[0].lost);

    net.set_link_params(link, LinkParams::new(5, 0.0)).unwrap();
    for seq in 0..20 {
        let name = Name::from("/b/ping/retry").append(seq.to_string());
        a.express_interest(Interest::new(name)).await.unwrap();
    }
    assert_eq!(stats(&net, "a", "b").a_to_b.lost_packets, 1);
}

#[tokio::test(start_paused = true)]
async fn hop_limit_stops_forwarding() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    net.add_node("b").unwrap();
    net.add_node("c").unwrap();
    net.connect("a", "b", LinkParams::new(5, 0.0)).await.unwrap();
    net.connect("b", "c", LinkParams::new(5, 0.0)).await.unwrap();
    net.add_route_via("a", &Name::from("/c"), "b", RouteOptions::default())
        .await
        .unwrap();
    net.add_route_via("b", &Name::from("/c"), "c", RouteOptions::default())
        .await
        .unwrap();
    producer(&net, "c", "/c", "far").await;

    let err = a
        .express_interest(Interest::new("/c/1").with_hop_limit(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Nacked {
            reason: NackReason::NoRoute,
            ..
        }
    ));
    assert_eq!(stats(&net, "b", "c").a_to_b.sent_packets, 0);

    let data = a
        .express_interest(Interest::new("/c/2").with_hop_limit(2))
        .await
        .unwrap();
    assert_eq!(&data.content[..], b"far");
}

#[tokio::test(start_paused = true)]
async fn multicast_reaches_every_next_hop() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    net.add_node("b").unwrap();
    net.add_node("c").unwrap();
    net.connect("a", "b", LinkParams::new(5, 0.0)).await.unwrap();
    net.connect("a", "c", LinkParams::new(5, 0.0)).await.unwrap();
    let prefix = Name::from("/m");
    net.add_route_via("a", &prefix, "b", RouteOptions::default()).await.unwrap();
    net.add_route_via("a", &prefix, "c", RouteOptions::default()).await.unwrap();
    a.set_strategy(&prefix, Strategy::Multicast).await;
    producer(&net, "b", "/m", "b").await;
    producer(&net, "c", "/m", "c").await;

    a.express_interest(Interest::new("/m/1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(stats(&net, "a", "b").a_to_b.sent_packets, 1);
    assert_eq!(stats(&net, "a", "c").a_to_b.sent_packets, 1);
    // The second copy of the Data finds no PIT entry
    assert_eq!(a.metrics().data_unsolicited.value(), 1);
}

#[tokio::test(start_paused = true)]
async fn self_learning_floods_then_learns_a_route() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    let b = net.add_node("b").unwrap();
    net.add_node("c").unwrap();
    net.connect("a", "b", LinkParams::new(5, 0.0)).await.unwrap();
    net.connect("b", "c", LinkParams::new(5, 0.0)).await.unwrap();
    a.set_strategy(&Name::new(), Strategy::SelfLearning).await;
    b.set_strategy(&Name::new(), Strategy::SelfLearning).await;
    producer(&net, "c", "/c", "learned").await;

    let data = a.express_interest(Interest::new("/c/data/1")).await.unwrap();
    assert_eq!(&data.content[..], b"learned");

    let route = a.fib_lookup(&Name::from("/c/data/2")).await.unwrap();
    assert_eq!(route.prefix, Name::from("/c/data"));
    let route = b.fib_lookup(&Name::from("/c/data/2")).await.unwrap();
    assert_eq!(route.prefix, Name::from("/c/data"));

    a.express_interest(Interest::new("/c/data/2")).await.unwrap();
    assert_eq!(stats(&net, "b", "c").a_to_b.sent_packets, 2);
}

#[tokio::test(start_paused = true)]
async fn removing_topology_withdraws_routes() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    let b = net.add_node("b").unwrap();
    PingServer::register(&b, &Name::from("/b")).await.unwrap();
    let link = net.connect("a", "b", LinkParams::new(5, 0.0)).await.unwrap();
    net.add_route("a", &Name::from("/b"), link, RouteOptions::default())
        .await
        .unwrap();
    a.express_interest(Interest::new("/b/ping/1")).await.unwrap();

    net.remove_node("b").await.unwrap();
    assert!(net.node("b").is_none());
    assert!(net.connection(link).is_none());
    assert!(b.is_closed().await);
    assert_eq!(a.faces().await.len(), 1);

    let err = a.express_interest(Interest::new("/b/ping/2")).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Nacked {
            reason: NackReason::NoRoute,
            ..
        }
    ));
    assert!(net.fib_states().await["a"].is_empty());
}

#[tokio::test(start_paused = true)]
async fn busiest_link_and_node_follow_traffic() {
    let mut net = network();
    let a = net.add_node("a").unwrap();
    let b = net.add_node("b").unwrap();
    net.add_node("c").unwrap();
    PingServer::register(&b, &Name::from("/b")).await.unwrap();
    let ab = net.connect("a", "b", LinkParams::new(1, 0.0)).await.unwrap();
    net.connect("b", "c", LinkParams::new(1, 0.0)).await.unwrap();
    net.add_route("a", &Name::from("/b"), ab, RouteOptions::default())
        .await
        .unwrap();

    for seq in 0..3 {
        let name = Name::from("/b/ping").append(seq.to_string());
        a.express_interest(Interest::new(name)).await.unwrap();
    }

    let busiest = net.busiest_connection().unwrap();
    assert_eq!(busiest.id, ab);
    assert_eq!(busiest.total_packets(), 6);
    let idle = net.node_traffic().into_iter().find(|t| t.node == "c").unwrap();
    assert_eq!(idle.total(), 0);
    assert_ne!(net.busiest_node().unwrap().node, "c");
}
