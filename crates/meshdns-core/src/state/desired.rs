// # Desired State
//
// Maps each mesh device to the record that should exist for it.

use crate::config::ZoneConfig;
use crate::names;
use crate::traits::{Device, DnsRecord};
use std::collections::btree_map::{self, BTreeMap};
use tracing::{debug, warn};

/// Records that should exist, keyed by record name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    records: BTreeMap<String, DnsRecord>,
}

impl DesiredState {
    /// Derive the desired records from a device list
    ///
    /// Devices are skipped (and logged) when their name is not a valid DNS
    /// label, when they have no address of the configured family, or when an
    /// earlier device already produced the same record name.
    pub fn from_devices(devices: &[Device], zone: &ZoneConfig) -> Self {
        let mut records = BTreeMap::new();

        for device in devices {
            if let Err(e) = names::validate_label(&device.name) {
                warn!("Skipping device {}: {}", device, e);
                continue;
            }

            let Some(address) = device.address_for(zone.record_type) else {
                debug!(
                    "Skipping device {}: no {} address",
                    device, zone.record_type
                );
                continue;
            };

            let name = names::record_name(&device.name, &zone.name, zone.subdomain.as_deref());
            let record = DnsRecord::new(name.clone(), zone.record_type, address, zone.ttl)
                .with_comment(zone.ownership_tag.clone());

            match records.entry(name) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                btree_map::Entry::Occupied(slot) => {
                    warn!(
                        "Skipping device {}: record {} already claimed by another device",
                        device,
                        slot.key()
                    );
                }
            }
        }

        Self { records }
    }

    /// Look up a record by name
    pub fn get(&self, name: &str) -> Option<&DnsRecord> {
        self.records.get(name)
    }

    /// Iterate over records in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DnsRecord)> {
        self.records.iter()
    }

    /// Number of desired records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are desired
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<DnsRecord> for DesiredState {
    /// Build a state directly from records; the first record per name wins
    fn from_iter<I: IntoIterator<Item = DnsRecord>>(iter: I) -> Self {
        let mut records = BTreeMap::new();
        for record in iter {
            records.entry(record.name.clone()).or_insert(record);
        }
        Self { records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordType;

    fn device(name: &str, addresses: &[&str]) -> Device {
        Device::new(name, addresses.iter().map(|a| a.parse().unwrap()).collect())
    }

    #[test]
    fn test_records_named_after_devices() {
        let zone = ZoneConfig::new("example.com");
        let state = DesiredState::from_devices(
            &[device("alice", &["100.64.0.1"]), device("bob", &["100.64.0.2"])],
            &zone,
        );

        assert_eq!(state.len(), 2);
        let alice = state.get("alice.example.com").unwrap();
        assert_eq!(alice.value, "100.64.0.1".parse::<std::net::IpAddr>().unwrap());
        assert_eq!(alice.record_type, RecordType::A);
        assert_eq!(alice.ttl, 300);
        assert!(alice.is_managed("managed-by=meshdns"));
        assert!(alice.id.is_none());
    }

    #[test]
    fn test_subdomain_and_record_type() {
        let zone = ZoneConfig::new("example.com")
            .with_subdomain("ts")
            .with_record_type(RecordType::Aaaa);
        let state = DesiredState::from_devices(
            &[
                device("alice", &["100.64.0.1", "fd7a:115c:a1e0::1"]),
                device("bob", &["100.64.0.2"]),
            ],
            &zone,
        );

        assert_eq!(state.len(), 1);
        let alice = state.get("alice.ts.example.com").unwrap();
        assert_eq!(alice.record_type, RecordType::Aaaa);
    }

    #[test]
    fn test_invalid_and_duplicate_devices_skipped() {
        let zone = ZoneConfig::new("example.com");
        let state = DesiredState::from_devices(
            &[
                device("alice", &["100.64.0.1"]),
                device("Alice", &["100.64.0.9"]),
                device("bad_name", &["100.64.0.3"]),
                device("", &["100.64.0.4"]),
            ],
            &zone,
        );

        assert_eq!(state.len(), 1);
        assert_eq!(
            state.get("alice.example.com").unwrap().value,
            "100.64.0.1".parse::<std::net::IpAddr>().unwrap()
        );
    }
}
