//! Test doubles and common utilities for engine contract tests
//!
//! Every double counts its calls through shared `Arc<AtomicUsize>`s so a test
//! can keep a handle while the registry owns the instance.

#![allow(dead_code)]

use async_trait::async_trait;
use ddns_core::config::{DdnsConfig, FamilyConfig, IpSourceDescriptor, ProviderConfig};
use ddns_core::error::{Error, Result};
use ddns_core::notify::Notification;
use ddns_core::registry::ProviderRegistry;
use ddns_core::traits::{
    DnsProvider, DnsProviderFactory, IpSource, IpSourceFactory, IpVersion, Notifier, RecordSpec,
    RemoteRecord,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const ZONE: &str = "zone-test";

/// What a scripted source answers
#[derive(Debug, Clone)]
pub enum Answer {
    Candidate(String),
    Fail(String),
    Panic,
}

/// Shared answers for every scripted source, keyed by source name
///
/// Tests change answers between passes to simulate an address change.
#[derive(Clone, Default)]
pub struct ScriptedNetwork {
    answers: Arc<Mutex<HashMap<String, Answer>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self, source: &str, answer: Answer) {
        self.answers
            .lock()
            .unwrap()
            .insert(source.to_string(), answer);
    }

    pub fn candidate(&self, source: &str, candidate: &str) {
        self.answer(source, Answer::Candidate(candidate.to_string()));
    }

    pub fn fail(&self, source: &str) {
        self.answer(source, Answer::Fail("connection refused".to_string()));
    }

    /// Number of times a source was asked
    pub fn calls(&self, source: &str) -> usize {
        self.calls.lock().unwrap().get(source).copied().unwrap_or(0)
    }

    fn fetch(&self, source: &str) -> Answer {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(source.to_string())
            .or_default() += 1;
        self.answers
            .lock()
            .unwrap()
            .get(source)
            .cloned()
            .unwrap_or_else(|| Answer::Fail("no answer scripted".to_string()))
    }
}

pub struct ScriptedSource {
    name: String,
    version: IpVersion,
    network: ScriptedNetwork,
}

#[async_trait]
impl IpSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> IpVersion {
        self.version
    }

    async fn fetch_candidate(&self) -> Result<String> {
        match self.network.fetch(&self.name) {
            Answer::Candidate(c) => Ok(c),
            Answer::Fail(msg) => Err(Error::source_unavailable(&self.name, msg)),
            Answer::Panic => panic!("source {} exploded", self.name),
        }
    }
}

pub struct ScriptedSourceFactory {
    network: ScriptedNetwork,
}

impl IpSourceFactory for ScriptedSourceFactory {
    fn create(&self, descriptor: &IpSourceDescriptor) -> Result<Box<dyn IpSource>> {
        Ok(Box::new(ScriptedSource {
            name: descriptor.name.clone(),
            version: descriptor.version,
            network: self.network.clone(),
        }))
    }
}

/// Descriptor routed to the scripted factory
pub fn scripted(name: &str, version: IpVersion) -> IpSourceDescriptor {
    let mut descriptor = IpSourceDescriptor::http(name, format!("mock://{name}"), version);
    descriptor.kind = "scripted".to_string();
    descriptor
}

/// In-memory zone with call counters and failure injection
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    records: Arc<Mutex<Vec<RemoteRecord>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    next_id: Arc<AtomicUsize>,
    find_count: Arc<AtomicUsize>,
    create_count: Arc<AtomicUsize>,
    modify_count: Arc<AtomicUsize>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new mock that shares state and counters with another
    pub fn sharing_counters_with(other: &MockDnsProvider) -> Self {
        other.clone()
    }

    /// Seed an existing record
    pub fn seed(&self, name: &str, record_type: &str, content: &str, ttl: u32, location: &str) {
        let id = self.allocate_id();
        self.records.lock().unwrap().push(RemoteRecord {
            record_id: id,
            name: name.to_string(),
            record_type: record_type.to_string(),
            content: content.to_string(),
            ttl,
            location: location.to_string(),
        });
    }

    /// Every call touching `domain` fails from now on
    pub fn fail_domain(&self, domain: &str) {
        self.failing.lock().unwrap().insert(domain.to_string());
    }

    pub fn records(&self) -> Vec<RemoteRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn content_of(&self, name: &str, record_type: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name && r.record_type == record_type)
            .map(|r| r.content.clone())
    }

    pub fn find_count(&self) -> usize {
        self.find_count.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.create_count.load(Ordering::SeqCst)
    }

    pub fn modify_count(&self) -> usize {
        self.modify_count.load(Ordering::SeqCst)
    }

    /// Creates plus modifies
    pub fn write_count(&self) -> usize {
        self.create_count() + self.modify_count()
    }

    fn allocate_id(&self) -> String {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn check(&self, domain: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(domain) {
            return Err(Error::provider("mock", format!("injected failure for {domain}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_records(
        &self,
        _zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<RemoteRecord>> {
        self.find_count.fetch_add(1, Ordering::SeqCst);
        self.check(name)?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.name == name && r.record_type == record_type)
            .cloned()
            .collect())
    }

    async fn create_record(&self, _zone_id: &str, spec: &RecordSpec) -> Result<Option<String>> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        self.check(&spec.name)?;
        let id = self.allocate_id();
        self.records.lock().unwrap().push(RemoteRecord {
            record_id: id.clone(),
            name: spec.name.clone(),
            record_type: spec.record_type.clone(),
            content: spec.content.clone(),
            ttl: spec.ttl,
            location: spec.location.clone(),
        });
        Ok(Some(id))
    }

    async fn modify_record(&self, _zone_id: &str, record: &RemoteRecord) -> Result<()> {
        self.modify_count.fetch_add(1, Ordering::SeqCst);
        self.check(&record.name)?;
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.record_id == record.record_id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(Error::provider("mock", "record not found")),
        }
    }

    async fn count_records(&self, _zone_id: &str) -> Result<usize> {
        Ok(self.records.lock().unwrap().len())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub struct MockProviderFactory {
    provider: MockDnsProvider,
}

impl DnsProviderFactory for MockProviderFactory {
    fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(MockDnsProvider::sharing_counters_with(
            &self.provider,
        )))
    }
}

/// Notifier that records everything it is asked to send
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.sent.lock().unwrap().iter().map(|n| n.kind()).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> bool {
        self.sent.lock().unwrap().push(notification.clone());
        true
    }
}

/// Registry wired to the scripted network and the mock zone
pub fn test_registry(
    network: &ScriptedNetwork,
    provider: &MockDnsProvider,
) -> Arc<ProviderRegistry> {
    let registry = ProviderRegistry::new();
    registry.register_provider(
        "mock",
        Box::new(MockProviderFactory {
            provider: provider.clone(),
        }),
    );
    registry.register_ip_source(
        "scripted",
        Box::new(ScriptedSourceFactory {
            network: network.clone(),
        }),
    );
    Arc::new(registry)
}

/// Valid configuration using the mock provider and scripted sources
///
/// IPv4 uses sources `v4-a`, `v4-b`, `v4-c` in that order and IPv6 uses
/// `v6-a`. Only IPv4 is enabled.
pub fn test_config(ipv4_domains: &[&str]) -> DdnsConfig {
    let mut config = DdnsConfig::new();
    config.provider = ProviderConfig::Custom {
        factory: "mock".to_string(),
        config: serde_json::json!({}),
    };
    config.zone_id = ZONE.to_string();
    config.ipv4 = FamilyConfig::enabled(ipv4_domains.iter().copied());
    config.ip_sources.ipv4 = vec![
        scripted("v4-a", IpVersion::V4),
        scripted("v4-b", IpVersion::V4),
        scripted("v4-c", IpVersion::V4),
    ];
    config.ip_sources.ipv6 = vec![scripted("v6-a", IpVersion::V6)];
    config
}

/// One-shot HTTP stub answering every request with `status` and `body`
///
/// Returns the base URL and a handle yielding the raw requests received.
pub async fn spawn_stub_server(
    status: u16,
    body: &'static str,
) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let raw = read_request(&mut socket).await;
            seen.lock().unwrap().push(raw);
            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}"), requests)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let length = text[..head_end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
