//! Reconciliation Contract Test
//!
//! Verifies that passes converge the remote zone and then stop writing:
//! - Created on first sight, NoChange afterwards, Updated on address change
//! - A failing domain never affects its siblings
//! - IPv4 and IPv6 are reconciled independently

mod common;

use common::*;
use ddns_core::history::HistoryLevel;
use ddns_core::reconcile::RecordAction;
use ddns_core::traits::IpVersion;
use ddns_core::{DdnsEngine, PassReport};
use std::sync::Arc;

fn actions(report: &PassReport) -> Vec<RecordAction> {
    report.outcomes.iter().map(|o| o.action).collect()
}

#[tokio::test]
async fn repeated_passes_are_idempotent() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "203.0.113.7");
    let provider = MockDnsProvider::new();

    let engine = DdnsEngine::new(
        test_config(&["home.example.com"]),
        test_registry(&network, &provider),
    );
    engine.start().await.unwrap();

    assert_eq!(provider.create_count(), 1);
    assert_eq!(
        provider.content_of("home.example.com", "A").as_deref(),
        Some("203.0.113.7")
    );

    for _ in 0..3 {
        let report = engine.trigger().await;
        assert!(report.success);
        assert_eq!(actions(&report), vec![RecordAction::NoChange]);
    }
    assert_eq!(provider.write_count(), 1, "Unchanged address must not write");

    network.candidate("v4-a", "198.51.100.20");
    let report = engine.trigger().await;
    assert_eq!(actions(&report), vec![RecordAction::Updated]);
    assert_eq!(report.outcomes[0].old_value.as_deref(), Some("203.0.113.7"));
    assert_eq!(report.outcomes[0].new_value, "198.51.100.20");
    assert_eq!(provider.modify_count(), 1);
}

#[tokio::test]
async fn modify_keeps_existing_ttl_and_location() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "203.0.113.7");
    let provider = MockDnsProvider::new();
    provider.seed("home.example.com", "A", "192.0.2.1", 600, "Overseas");

    let engine = DdnsEngine::new(
        test_config(&["home.example.com"]),
        test_registry(&network, &provider),
    );
    engine.start().await.unwrap();

    let records = provider.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content, "203.0.113.7");
    assert_eq!(records[0].ttl, 600);
    assert_eq!(records[0].location, "Overseas");
    assert_eq!(provider.create_count(), 0);
}

#[tokio::test]
async fn configured_record_defaults_apply_on_create() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "203.0.113.7");
    let provider = MockDnsProvider::new();

    let mut config = test_config(&["home.example.com"]);
    config.record.ttl = Some(120);
    config.record.location = Some("Mainland".to_string());

    let engine = DdnsEngine::new(config, test_registry(&network, &provider));
    engine.start().await.unwrap();

    let records = provider.records();
    assert_eq!(records[0].ttl, 120);
    assert_eq!(records[0].location, "Mainland");
}

#[tokio::test]
async fn failing_domain_is_isolated() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "203.0.113.7");
    let provider = MockDnsProvider::new();
    provider.fail_domain("b.example.com");

    let engine = DdnsEngine::new(
        test_config(&["a.example.com", "b.example.com", "c.example.com"]),
        test_registry(&network, &provider),
    );
    engine.start().await.unwrap();

    let report = engine.trigger().await;
    assert!(!report.success);
    assert_eq!(
        actions(&report),
        vec![
            RecordAction::NoChange,
            RecordAction::Failed,
            RecordAction::NoChange
        ]
    );
    assert!(report.outcomes[1].error.is_some());
    assert_eq!(report.succeeded(), 2);
    assert_eq!(
        provider.content_of("c.example.com", "A").as_deref(),
        Some("203.0.113.7")
    );
}

#[tokio::test]
async fn families_are_reconciled_independently() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "203.0.113.7");
    network.fail("v6-a");
    let provider = MockDnsProvider::new();

    let mut config = test_config(&["home.example.com"]);
    config.ipv6.enabled = true;
    config.ipv6.domains = vec!["home.example.com".to_string()];

    let engine = DdnsEngine::new(config, test_registry(&network, &provider));
    engine.start().await.unwrap();

    let report = engine.trigger().await;
    assert!(!report.success, "IPv6 detection failed");
    assert_eq!(
        report
            .address(IpVersion::V4)
            .map(|ip| ip.to_string())
            .as_deref(),
        Some("203.0.113.7")
    );
    assert!(report.address(IpVersion::V6).is_none());
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].record_type, "A");
    assert!(provider.content_of("home.example.com", "AAAA").is_none());

    network.candidate("v6-a", "2001:db8:85a3::8a2e:370:7334");
    let report = engine.trigger().await;
    assert!(report.success);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(
        provider.content_of("home.example.com", "AAAA").as_deref(),
        Some("2001:db8:85a3::8a2e:370:7334")
    );
    assert_eq!(
        provider.content_of("home.example.com", "A").as_deref(),
        Some("203.0.113.7")
    );
}

#[tokio::test]
async fn ipv6_reconciles_when_ipv4_detection_fails() {
    let network = ScriptedNetwork::new();
    network.fail("v4-a");
    network.fail("v4-b");
    network.fail("v4-c");
    network.candidate("v6-a", "2001:db8::42");
    let provider = MockDnsProvider::new();

    let mut config = test_config(&["home.example.com"]);
    config.ipv6.enabled = true;
    config.ipv6.domains = vec!["home.example.com".to_string()];

    let engine = DdnsEngine::new(config, test_registry(&network, &provider));
    engine.start().await.unwrap();

    assert_eq!(
        provider.content_of("home.example.com", "AAAA").as_deref(),
        Some("2001:db8::42")
    );
    assert!(provider.content_of("home.example.com", "A").is_none());
    assert_eq!(provider.write_count(), 1, "Only the AAAA record is written");

    let history = engine.history(usize::MAX).await;
    let detection_errors: Vec<_> = history
        .iter()
        .filter(|e| e.level == HistoryLevel::Error && e.message.starts_with("Failed to detect"))
        .collect();
    assert_eq!(detection_errors.len(), 1);
    assert!(detection_errors[0].message.contains("IPv4"));
    assert!(history.iter().any(|e| {
        e.level == HistoryLevel::Info
            && e.message == "created AAAA record home.example.com -> 2001:db8::42"
    }));
}

#[tokio::test]
async fn each_outcome_is_written_to_history() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "203.0.113.7");
    let provider = MockDnsProvider::new();
    provider.fail_domain("bad.example.com");

    let engine = DdnsEngine::new(
        test_config(&["good.example.com", "bad.example.com"]),
        test_registry(&network, &provider),
    );
    engine.start().await.unwrap();

    let history = engine.history(usize::MAX).await;
    let messages: Vec<_> = history.iter().map(|e| (e.level, e.message.as_str())).collect();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0], (HistoryLevel::Error, "Pass finished, succeeded: 1/2"));
    assert_eq!(messages[1].0, HistoryLevel::Error);
    assert!(messages[1].1.starts_with("failed to reconcile A record bad.example.com"));
    assert_eq!(
        messages[2],
        (HistoryLevel::Info, "created A record good.example.com -> 203.0.113.7")
    );
    assert_eq!(messages[3], (HistoryLevel::Info, "Service started"));
}

#[tokio::test]
async fn duplicate_records_update_the_first_and_warn() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "203.0.113.7");
    let provider = MockDnsProvider::new();
    provider.seed("home.example.com", "A", "192.0.2.1", 600, "Default");
    provider.seed("home.example.com", "A", "192.0.2.2", 600, "Default");

    let engine = DdnsEngine::new(
        test_config(&["home.example.com"]),
        test_registry(&network, &provider),
    );
    engine.start().await.unwrap();

    let records = provider.records();
    assert_eq!(records[0].content, "203.0.113.7");
    assert_eq!(records[1].content, "192.0.2.2", "Only the first match is touched");
    assert_eq!(provider.modify_count(), 1);

    let history = engine.history(usize::MAX).await;
    let warnings: Vec<_> = history
        .iter()
        .filter(|e| e.level == HistoryLevel::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].message,
        "2 A records match home.example.com, only the first was reconciled"
    );
}

#[tokio::test]
async fn snapshot_reflects_last_pass() {
    let network = ScriptedNetwork::new();
    network.candidate("v4-a", "203.0.113.7");
    let provider = MockDnsProvider::new();

    let mut config = test_config(&["a.example.com", " a.example.com ", "b.example.com"]);
    config.ipv6.domains = vec!["v6.example.com".to_string()];

    let engine = Arc::new(DdnsEngine::new(config, test_registry(&network, &provider)));
    engine.start().await.unwrap();

    let snapshot = engine.snapshot().await;
    assert!(snapshot.running);
    assert!(snapshot.config_valid);
    assert!(snapshot.last_check_time.is_some());
    assert_eq!(snapshot.last_ipv4.as_deref(), Some("203.0.113.7"));
    assert_eq!(snapshot.last_ipv6, None);
    assert_eq!(snapshot.ipv4_domains, 2);
    assert_eq!(snapshot.ipv6_domains, 1);
    assert_eq!(snapshot.total_domains, 3);
    assert!(!snapshot.ipv6_enabled);
}
