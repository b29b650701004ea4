//! IP Source Cascade Contract Test
//!
//! Verifies that detection walks the configured sources in order:
//! - Failing sources and unusable candidates are skipped
//! - The first valid candidate wins and later sources are never asked
//! - An exhausted cascade fails only its own family

mod common;

use common::*;
use ddns_core::DdnsEngine;
use ddns_core::history::HistoryLevel;
use ddns_core::traits::IpVersion;

#[tokio::test]
async fn first_valid_candidate_wins() {
    let network = ScriptedNetwork::new();
    network.fail("v4-a");
    network.candidate("v4-b", "10.0.0.5");
    network.candidate("v4-c", "203.0.113.7");
    let provider = MockDnsProvider::new();

    let engine = DdnsEngine::new(
        test_config(&["home.example.com"]),
        test_registry(&network, &provider),
    );
    engine.start().await.unwrap();

    let report = engine.trigger().await;
    assert!(report.success);
    assert_eq!(
        report.address(IpVersion::V4).map(|ip| ip.to_string()).as_deref(),
        Some("203.0.113.7")
    );
    assert_eq!(network.calls("v4-a"), 2);
    assert_eq!(network.calls("v4-b"), 2);
    assert_eq!(network.calls("v4-c"), 2);
}

#[tokio::test]
async fn later_sources_are_not_contacted() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "203.0.113.7");
    network.candidate("v4-b", "198.51.100.1");
    let provider = MockDnsProvider::new();

    let engine = DdnsEngine::new(
        test_config(&["home.example.com"]),
        test_registry(&network, &provider),
    );
    engine.start().await.unwrap();

    assert_eq!(network.calls("v4-a"), 1);
    assert_eq!(network.calls("v4-b"), 0);
    assert_eq!(network.calls("v4-c"), 0);
}

#[tokio::test]
async fn wrong_family_and_garbage_are_rejected() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "2001:db8::1");
    network.candidate("v4-b", "<html>rate limited</html>");
    network.candidate("v4-c", " 203.0.113.9\n");
    let provider = MockDnsProvider::new();

    let engine = DdnsEngine::new(
        test_config(&["home.example.com"]),
        test_registry(&network, &provider),
    );
    engine.start().await.unwrap();

    assert_eq!(
        provider.content_of("home.example.com", "A").as_deref(),
        Some("203.0.113.9")
    );
}

#[tokio::test]
async fn exhausted_cascade_fails_the_pass_without_touching_records() {
    let network = ScriptedNetwork::new();
    network.fail("v4-a");
    network.candidate("v4-b", "127.0.0.1");
    network.candidate("v4-c", "192.168.1.10");
    let provider = MockDnsProvider::new();

    let engine = DdnsEngine::new(
        test_config(&["home.example.com"]),
        test_registry(&network, &provider),
    );
    engine.start().await.unwrap();

    let report = engine.trigger().await;
    assert!(!report.success);
    assert!(report.outcomes.is_empty());
    assert!(report.ipv4.is_none());
    assert_eq!(provider.find_count(), 0);

    let history = engine.history(10).await;
    assert!(history.iter().any(|e| {
        e.level == HistoryLevel::Error && e.message.contains("no public IPv4 address found")
    }));

    let snapshot = engine.snapshot().await;
    assert!(snapshot.last_check_time.is_some());
    assert!(snapshot.last_ipv4.is_none());
}

#[tokio::test]
async fn last_known_address_survives_a_failed_detection() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "203.0.113.7");
    let provider = MockDnsProvider::new();

    let engine = DdnsEngine::new(
        test_config(&["home.example.com"]),
        test_registry(&network, &provider),
    );
    engine.start().await.unwrap();

    network.fail("v4-a");
    let report = engine.trigger().await;
    assert!(!report.success);
    assert_eq!(
        engine.snapshot().await.last_ipv4.as_deref(),
        Some("203.0.113.7")
    );
}
