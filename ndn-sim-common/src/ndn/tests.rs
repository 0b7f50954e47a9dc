//! Unit tests for the NDN packet implementation

use super::*;
use std::time::Duration;

#[test]
fn test_name_creation() {
    // Create a name from a string
    let name: Name = "/test/data/1".parse().unwrap();

    // Check the components
    assert_eq!(name.len(), 3);
    assert_eq!(name.get(0).unwrap().as_bytes().as_ref(), b"test");
    assert_eq!(name.get(2).unwrap().as_bytes().as_ref(), b"1");

    // Convert back to string
    assert_eq!(name.to_string(), "/test/data/1");
    assert_eq!(Name::new().to_string(), "/");
}

#[test]
fn test_name_percent_encoding() {
    let name = Name::new().append(vec![b'a', b' ', 0xff]);
    assert_eq!(name.to_string(), "/a%20%FF");

    let parsed: Name = "/a%20%FF".parse().unwrap();
    assert_eq!(parsed, name);

    assert!("/bad%G1".parse::<Name>().is_err());
    assert!("/bad%1".parse::<Name>().is_err());
}

#[test]
fn test_name_compare() {
    let name1 = Name::from("/a/b/c");
    let name2 = Name::from("/a/b/c");
    let name3 = Name::from("/a/b/d");
    let name4 = Name::from("/a/b");

    assert_eq!(name1, name2);
    assert_ne!(name1, name3);
    assert_ne!(name1, name4);

    // Test prefix matching
    assert!(name4.is_prefix_of(&name1));
    assert!(!name1.is_prefix_of(&name4));
    assert!(!name3.is_prefix_of(&name1));
    assert!(Name::new().is_prefix_of(&name1));
    assert_eq!(name1.prefix(2), name4);
}

#[test]
fn test_name_order_keeps_prefixes_contiguous() {
    let mut names = vec![
        Name::from("/a/c"),
        Name::from("/a/b/z"),
        Name::from("/a"),
        Name::from("/a/b"),
        Name::from("/b"),
    ];
    names.sort();
    let rendered: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    assert_eq!(rendered, vec!["/a", "/a/b", "/a/b/z", "/a/c", "/b"]);
}

#[test]
fn test_interest_packet() {
    let interest = Interest::new("/test/interest")
        .with_can_be_prefix(true)
        .with_must_be_fresh(true)
        .with_nonce(42)
        .with_lifetime(Duration::from_millis(1500))
        .with_hop_limit(8);

    assert_eq!(interest.name(), &Name::from("/test/interest"));
    assert!(interest.can_be_prefix);
    assert!(interest.must_be_fresh);
    assert_eq!(interest.nonce, 42);
    assert_eq!(interest.lifetime, Duration::from_millis(1500));
    assert_eq!(interest.hop_limit, Some(8));

    let defaults = Interest::new("/x");
    assert_eq!(defaults.lifetime, DEFAULT_INTEREST_LIFETIME);
    assert!(!defaults.can_be_prefix);
    assert!(!defaults.must_be_fresh);
}

#[test]
fn test_interest_matches_data() {
    let data = Data::new("/a/b/c", "x");

    assert!(Interest::new("/a/b/c").matches_data(&data));
    assert!(!Interest::new("/a/b").matches_data(&data));
    assert!(Interest::new("/a/b").with_can_be_prefix(true).matches_data(&data));
    assert!(!Interest::new("/a/x").with_can_be_prefix(true).matches_data(&data));
}

#[test]
fn test_same_selectors() {
    let a = Interest::new("/a").with_nonce(1);
    let b = Interest::new("/a").with_nonce(2);
    let c = Interest::new("/a").with_must_be_fresh(true);

    assert!(a.same_selectors(&b));
    assert!(!a.same_selectors(&c));
}

#[test]
fn test_data_packet() {
    let data = Data::new("/test/data", "Hello, NDN!")
        .with_freshness(Duration::from_secs(10))
        .with_signature(vec![0u8; 32]);

    assert_eq!(data.name(), &Name::from("/test/data"));
    assert_eq!(data.content.as_ref(), b"Hello, NDN!");
    assert_eq!(data.freshness_period, Some(Duration::from_secs(10)));
    assert_eq!(data.signature.len(), 32);
}

#[test]
fn test_packet_kind_and_name() {
    let interest = Interest::new("/n").with_nonce(3);
    let nack = Nack::new(interest.clone(), NackReason::NoRoute);

    let packet = Packet::from(nack);
    assert_eq!(packet.kind(), PacketKind::Nack);
    assert_eq!(packet.name(), &Name::from("/n"));
    assert!(packet.wire_size() > Packet::from(interest).wire_size());
    assert_eq!(NackReason::NoRoute.code(), 150);
    assert_eq!(NackReason::NoRoute.to_string(), "no-route");
}
