//! Test doubles and common utilities for sync contract tests
//!
//! This module provides in-memory stand-ins for the mesh directory and the
//! DNS provider so runs can be observed without any network access.

#![allow(dead_code)]

use meshdns_core::config::{DirectoryConfig, ProviderConfig, RunnerConfig, SyncConfig, ZoneConfig};
use meshdns_core::error::{Error, ProviderOperation, Result};
use meshdns_core::traits::{Device, DeviceDirectory, DnsProvider, DnsRecord};
use meshdns_core::RecordType;
use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TAG: &str = "managed-by=meshdns";
pub const ZONE: &str = "example.com";

/// A directory returning a fixed device list, or failing
pub struct StaticDirectory {
    devices: Vec<Device>,
    fail: bool,
    call_count: Arc<AtomicUsize>,
}

impl StaticDirectory {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices,
            fail: false,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A directory whose credential has expired
    pub fn unavailable() -> Self {
        Self {
            devices: Vec::new(),
            fail: true,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DeviceDirectory for StaticDirectory {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::directory("API key expired"));
        }
        Ok(self.devices.clone())
    }

    fn directory_name(&self) -> &'static str {
        "static"
    }
}

#[derive(Default)]
struct ZoneInner {
    records: BTreeMap<String, DnsRecord>,
    next_id: usize,
    calls: Vec<(ProviderOperation, String)>,
}

/// An in-memory zone implementing DnsProvider
///
/// Clones share the same zone, so a test can keep one handle and give the
/// other to the runner.
#[derive(Clone, Default)]
pub struct InMemoryZone {
    inner: Arc<Mutex<ZoneInner>>,
    fail_list: Arc<Mutex<bool>>,
    fail_names: Arc<Mutex<HashSet<String>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryZone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the zone with a record, assigning it an ID
    pub fn seed(&self, record: DnsRecord) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("rec-{}", inner.next_id);
        inner.records.insert(id.clone(), record.with_id(id));
    }

    /// Make `list_records` fail
    pub fn fail_listing(&self) {
        *self.fail_list.lock().unwrap() = true;
    }

    /// Make every change targeting `name` fail
    pub fn fail_changes_to(&self, name: &str) {
        self.fail_names.lock().unwrap().insert(name.to_string());
    }

    /// Sleep this long inside every call
    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// All records currently in the zone
    pub fn records(&self) -> Vec<DnsRecord> {
        self.inner.lock().unwrap().records.values().cloned().collect()
    }

    /// Find a record by name
    pub fn find(&self, name: &str) -> Option<DnsRecord> {
        self.records().into_iter().find(|r| r.name == name)
    }

    /// Mutating calls received so far (listings excluded)
    pub fn change_calls(&self) -> Vec<(ProviderOperation, String)> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(op, _)| *op != ProviderOperation::List)
            .cloned()
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(op, _)| *op == ProviderOperation::List)
            .count()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(&self, operation: ProviderOperation, name: &str) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push((operation, name.to_string()));
        if self.fail_names.lock().unwrap().contains(name) {
            return Err(Error::provider("memory", operation, name, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsProvider for InMemoryZone {
    async fn list_records(&self, zone: &str) -> Result<Vec<DnsRecord>> {
        self.pause().await;
        self.inner
            .lock()
            .unwrap()
            .calls
            .push((ProviderOperation::List, zone.to_string()));
        if *self.fail_list.lock().unwrap() {
            return Err(Error::provider(
                "memory",
                ProviderOperation::List,
                zone,
                "HTTP 503",
            ));
        }
        Ok(self.records())
    }

    async fn create_record(&self, _zone: &str, record: &DnsRecord) -> Result<DnsRecord> {
        self.pause().await;
        self.check(ProviderOperation::Create, &record.name)?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("rec-{}", inner.next_id);
        let created = record.clone().with_id(id.clone());
        inner.records.insert(id, created.clone());
        Ok(created)
    }

    async fn update_record(
        &self,
        _zone: &str,
        existing: &DnsRecord,
        desired: &DnsRecord,
    ) -> Result<DnsRecord> {
        self.pause().await;
        self.check(ProviderOperation::Update, &desired.name)?;
        let id = existing.id.clone().expect("listed records carry an ID");
        let mut inner = self.inner.lock().unwrap();
        if !inner.records.contains_key(&id) {
            return Err(Error::provider(
                "memory",
                ProviderOperation::Update,
                &desired.name,
                "no such record",
            ));
        }
        let updated = desired.clone().with_id(id.clone());
        inner.records.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_record(&self, _zone: &str, record: &DnsRecord) -> Result<()> {
        self.pause().await;
        self.check(ProviderOperation::Delete, &record.name)?;
        let id = record.id.clone().expect("listed records carry an ID");
        self.inner.lock().unwrap().records.remove(&id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Build a device from a name and address literals
pub fn device(name: &str, addresses: &[&str]) -> Device {
    Device::new(name, addresses.iter().map(|a| ip(a)).collect())
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid IP literal")
}

/// A managed A record as the runner would create it
pub fn managed_a(name: &str, value: &str) -> DnsRecord {
    DnsRecord::new(name, RecordType::A, ip(value), 300).with_comment(TAG)
}

/// An A record nobody tagged
pub fn unmanaged_a(name: &str, value: &str) -> DnsRecord {
    DnsRecord::new(name, RecordType::A, ip(value), 300)
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config() -> SyncConfig {
    SyncConfig {
        directory: DirectoryConfig::Tailscale {
            tailnet: "user@gmail.com".to_string(),
            api_key: "test-key".to_string(),
        },
        provider: ProviderConfig::Cloudflare {
            api_token: "test-token".to_string(),
            zone_id: Some("test-zone".to_string()),
        },
        zone: ZoneConfig::new(ZONE),
        runner: RunnerConfig {
            dry_run: false,
            timeout_secs: 5,
            event_channel_capacity: 100,
        },
    }
}
