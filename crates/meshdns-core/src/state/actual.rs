// # Actual State
//
// The managed subset of what the DNS provider currently serves.

use crate::config::ZoneConfig;
use crate::names;
use crate::traits::DnsRecord;
use std::collections::btree_map::{self, BTreeMap};
use tracing::{debug, warn};

/// Managed records currently in the zone, keyed by record name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActualState {
    records: BTreeMap<String, DnsRecord>,
    duplicates: Vec<DnsRecord>,
}

impl ActualState {
    /// Filter a provider listing down to the records this tool owns
    ///
    /// A record is kept when it carries the zone's ownership tag and its name
    /// is a single label under the managed suffix (the zone, or the subdomain
    /// when one is configured). Records without the tag are never returned, so
    /// they can never be updated or deleted. Deeper names such as
    /// `alice.ts.example.com` belong to an instance configured with that
    /// subdomain and are ignored by one publishing straight into the zone.
    ///
    /// When several managed records share a name, the one matching the
    /// configured record type is kept; the others are reported through
    /// [`ActualState::duplicates`] and removed by the next plan.
    pub fn from_records(listing: Vec<DnsRecord>, zone: &ZoneConfig) -> Self {
        let suffix = names::managed_suffix(&zone.name, zone.subdomain.as_deref());
        let mut records: BTreeMap<String, DnsRecord> = BTreeMap::new();
        let mut duplicates = Vec::new();

        for record in listing {
            if !record.is_managed(&zone.ownership_tag) {
                continue;
            }

            if !is_single_label_under(&record.name, &suffix) {
                debug!(
                    "Ignoring managed record {} outside {}",
                    record.name,
                    suffix.trim_start_matches('.')
                );
                continue;
            }

            match records.entry(record.name.clone()) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                btree_map::Entry::Occupied(mut slot) => {
                    let displaced = if slot.get().record_type != zone.record_type
                        && record.record_type == zone.record_type
                    {
                        slot.insert(record)
                    } else {
                        record
                    };
                    warn!(
                        "Duplicate managed record {} will be removed",
                        displaced
                    );
                    duplicates.push(displaced);
                }
            }
        }

        Self {
            records,
            duplicates,
        }
    }

    /// Look up a record by name
    pub fn get(&self, name: &str) -> Option<&DnsRecord> {
        self.records.get(name)
    }

    /// Iterate over records in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DnsRecord)> {
        self.records.iter()
    }

    /// Number of managed records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the zone holds no managed records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Managed records that shared a name with a kept record
    pub fn duplicates(&self) -> &[DnsRecord] {
        &self.duplicates
    }

    pub(crate) fn insert(&mut self, record: DnsRecord) {
        self.records.insert(record.name.clone(), record);
    }

    /// Remove exactly this record, whether it is the kept one or a duplicate
    pub(crate) fn remove(&mut self, record: &DnsRecord) {
        if let Some(pos) = self.duplicates.iter().position(|d| d == record) {
            self.duplicates.remove(pos);
        } else if self.records.get(&record.name) == Some(record) {
            self.records.remove(&record.name);
        }
    }
}

/// `alice.example.com` is under `.example.com`; `alice.ts.example.com` is not
fn is_single_label_under(name: &str, suffix: &str) -> bool {
    name.strip_suffix(suffix)
        .is_some_and(|label| !label.is_empty() && !label.contains('.'))
}

impl FromIterator<DnsRecord> for ActualState {
    /// Build a state directly from already-filtered records
    fn from_iter<I: IntoIterator<Item = DnsRecord>>(iter: I) -> Self {
        let mut state = Self::default();
        for record in iter {
            state.insert(record);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordType;

    const TAG: &str = "managed-by=meshdns";

    fn record(name: &str, record_type: RecordType, value: &str) -> DnsRecord {
        DnsRecord::new(name, record_type, value.parse().unwrap(), 300)
    }

    #[test]
    fn test_unmanaged_records_filtered_out() {
        let zone = ZoneConfig::new("example.com");
        let state = ActualState::from_records(
            vec![
                record("alice.example.com", RecordType::A, "1.2.3.4").with_comment(TAG),
                record("www.example.com", RecordType::A, "5.6.7.8"),
                record("mail.example.com", RecordType::A, "5.6.7.9").with_comment("hand made"),
            ],
            &zone,
        );

        assert_eq!(state.len(), 1);
        assert!(state.get("alice.example.com").is_some());
        assert!(state.get("www.example.com").is_none());
    }

    #[test]
    fn test_records_outside_subdomain_ignored() {
        let zone = ZoneConfig::new("example.com").with_subdomain("ts");
        let state = ActualState::from_records(
            vec![
                record("alice.ts.example.com", RecordType::A, "1.2.3.4").with_comment(TAG),
                record("bob.example.com", RecordType::A, "1.2.3.5").with_comment(TAG),
                record("example.com", RecordType::A, "1.2.3.6").with_comment(TAG),
            ],
            &zone,
        );

        assert_eq!(state.len(), 1);
        assert!(state.get("alice.ts.example.com").is_some());
    }

    #[test]
    fn test_nested_names_ignored_without_subdomain() {
        let zone = ZoneConfig::new("example.com");
        let state = ActualState::from_records(
            vec![
                record("alice.example.com", RecordType::A, "1.2.3.4").with_comment(TAG),
                record("alice.ts.example.com", RecordType::A, "1.2.3.5").with_comment(TAG),
                record("example.com", RecordType::A, "1.2.3.6").with_comment(TAG),
            ],
            &zone,
        );

        assert_eq!(state.len(), 1);
        assert!(state.get("alice.example.com").is_some());
        assert!(state.get("alice.ts.example.com").is_none());
    }

    #[test]
    fn test_remove_targets_the_exact_record() {
        let zone = ZoneConfig::new("example.com");
        let kept = record("alice.example.com", RecordType::A, "1.1.1.1")
            .with_comment(TAG)
            .with_id("r1");
        let extra = record("alice.example.com", RecordType::A, "1.1.1.2")
            .with_comment(TAG)
            .with_id("r2");
        let mut state = ActualState::from_records(vec![kept.clone(), extra.clone()], &zone);

        state.remove(&extra);
        assert!(state.duplicates().is_empty());
        assert_eq!(state.get("alice.example.com"), Some(&kept));

        state.remove(&kept);
        assert!(state.is_empty());
    }

    #[test]
    fn test_duplicate_prefers_configured_type() {
        let zone = ZoneConfig::new("example.com");
        let state = ActualState::from_records(
            vec![
                record("alice.example.com", RecordType::Aaaa, "fd7a::1").with_comment(TAG),
                record("alice.example.com", RecordType::A, "1.2.3.4").with_comment(TAG),
            ],
            &zone,
        );

        assert_eq!(state.len(), 1);
        assert_eq!(state.get("alice.example.com").unwrap().record_type, RecordType::A);
        assert_eq!(state.duplicates().len(), 1);
        assert_eq!(state.duplicates()[0].record_type, RecordType::Aaaa);
    }
}
