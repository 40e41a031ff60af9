// # DNS Provider Trait
//
// Defines the interface for reading and modifying records in a DNS zone.
//
// ## Implementations
//
// - Cloudflare: `meshdns-provider-cloudflare` crate
// - DNSPod: `meshdns-provider-dnspod` crate
// - Future: Route53, DigitalOcean, etc.
//
// ## Usage
//
// ```rust,ignore
// use meshdns_core::{DnsProvider, DnsRecord, RecordType};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let record = DnsRecord::new(
//         "alice.example.com",
//         RecordType::A,
//         "100.64.0.1".parse()?,
//         300,
//     )
//     .with_comment("managed-by=meshdns");
//     provider.create_record("example.com", &record).await?;
//
//     Ok(())
// }
// ```

use crate::config::RecordType;
use async_trait::async_trait;
use std::fmt;
use std::net::IpAddr;

/// A DNS address record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider-specific record ID (absent for records not yet created)
    pub id: Option<String>,
    /// Fully qualified, lowercased record name
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Address the record points to
    pub value: IpAddr,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Free-form comment stored with the record; carries the ownership tag
    pub comment: Option<String>,
}

impl DnsRecord {
    /// Create a new record without an ID or comment
    pub fn new(name: impl Into<String>, record_type: RecordType, value: IpAddr, ttl: u32) -> Self {
        Self {
            id: None,
            name: crate::names::normalize(&name.into()),
            record_type,
            value,
            ttl,
            comment: None,
        }
    }

    /// Attach a provider record ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach a comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Whether this record carries the given ownership tag
    pub fn is_managed(&self, ownership_tag: &str) -> bool {
        self.comment.as_deref().map(str::trim) == Some(ownership_tag)
    }

    /// Whether two records publish the same data (ignores ID and comment)
    pub fn same_data(&self, other: &DnsRecord) -> bool {
        self.record_type == other.record_type && self.value == other.value && self.ttl == other.ttl
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{} ttl={}", self.name, self.record_type, self.value, self.ttl)
    }
}

/// Trait for DNS provider implementations
///
/// Implementations must handle the specifics of each provider's API.
///
/// # Trust Level: Untrusted
///
/// Providers are isolated and stateless:
/// - One logical change per call (listing may page through results)
/// - No retry logic or backoff; return an error and let the next run retry
/// - No decisions about whether a change is needed (owned by the reconciler)
/// - Never log credentials
///
/// # Errors
///
/// Every failure is reported as [`crate::Error::Provider`] naming the
/// operation and the record (or zone) it targeted.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List the address records of a zone
    ///
    /// Returns every A and AAAA record, managed or not; the caller filters by
    /// ownership tag. Records carry their provider ID.
    async fn list_records(&self, zone: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create a record
    ///
    /// The record's comment must be stored with it so later listings can
    /// recognise it as managed.
    ///
    /// # Returns
    ///
    /// The created record with its new ID.
    async fn create_record(&self, zone: &str, record: &DnsRecord)
    -> Result<DnsRecord, crate::Error>;

    /// Replace the data of an existing record
    ///
    /// `existing` comes from [`DnsProvider::list_records`] and carries the ID;
    /// `desired` holds the new type, value, TTL and comment.
    async fn update_record(
        &self,
        zone: &str,
        existing: &DnsRecord,
        desired: &DnsRecord,
    ) -> Result<DnsRecord, crate::Error>;

    /// Delete a record previously returned by [`DnsProvider::list_records`]
    async fn delete_record(&self, zone: &str, record: &DnsRecord) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    ///
    /// A static string identifying the provider (e.g., "cloudflare", "dnspod")
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
