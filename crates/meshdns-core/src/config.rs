//! Configuration types for the mesh DNS sync
//!
//! This module defines all configuration structures used throughout the crate.
//! Configuration is loaded once at startup and passed by value into the
//! runner and clients; nothing here is global.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Mesh directory configuration
    pub directory: DirectoryConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Target zone and record shape
    pub zone: ZoneConfig,

    /// Optional runner settings
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl SyncConfig {
    /// Create a configuration for the given zone with default settings
    pub fn new(directory: DirectoryConfig, provider: ProviderConfig, zone: ZoneConfig) -> Self {
        Self {
            directory,
            provider,
            zone,
            runner: RunnerConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.directory.validate()?;
        self.provider.validate()?;
        self.zone.validate()?;
        self.runner.validate()?;
        Ok(())
    }
}

/// Mesh directory configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectoryConfig {
    /// Tailscale API v2
    Tailscale {
        /// Tailnet name as shown in the admin panel (e.g. "user@gmail.com")
        tailnet: String,
        /// API key; these expire after 90 days
        api_key: String,
    },
}

impl DirectoryConfig {
    /// Validate the directory configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            DirectoryConfig::Tailscale { tailnet, api_key } => {
                if tailnet.is_empty() {
                    return Err(crate::Error::config("Tailscale tailnet cannot be empty"));
                }
                if api_key.is_empty() {
                    return Err(crate::Error::config("Tailscale API key cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the directory type name
    pub fn type_name(&self) -> &str {
        match self {
            DirectoryConfig::Tailscale { .. } => "tailscale",
        }
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryConfig::Tailscale { tailnet, .. } => f
                .debug_struct("Tailscale")
                .field("tailnet", tailnet)
                .field("api_key", &"<REDACTED>")
                .finish(),
        }
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token with Zone:DNS:Edit permissions
        api_token: String,
        /// Zone ID (optional, looked up by zone name when absent)
        zone_id: Option<String>,
    },

    /// DNSPod provider (dnsapi.cn)
    Dnspod {
        /// API token ID
        api_id: String,
        /// API token secret
        api_token: String,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Dnspod { api_id, api_token } => {
                if api_id.is_empty() || api_token.is_empty() {
                    return Err(crate::Error::config(
                        "DNSPod API ID and token cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Dnspod { .. } => "dnspod",
        }
    }

    /// TTL to use when none is configured
    ///
    /// DNSPod's free plan rejects TTLs below 600 seconds, so records there
    /// default to 600 instead of the zone-wide 300.
    pub fn default_ttl(&self) -> u32 {
        match self {
            ProviderConfig::Cloudflare { .. } => default_ttl(),
            ProviderConfig::Dnspod { .. } => DNSPOD_DEFAULT_TTL,
        }
    }
}

/// Lowest TTL every DNSPod plan accepts
pub const DNSPOD_DEFAULT_TTL: u32 = 600;

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare { zone_id, .. } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("zone_id", zone_id)
                .finish(),
            ProviderConfig::Dnspod { api_id, .. } => f
                .debug_struct("Dnspod")
                .field("api_id", api_id)
                .field("api_token", &"<REDACTED>")
                .finish(),
        }
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Record type for an address
    pub fn for_ip(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }

    /// Whether an address belongs to this record type
    pub fn matches(&self, ip: &IpAddr) -> bool {
        Self::for_ip(ip) == *self
    }

    /// Wire name used by DNS providers
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(crate::Error::invalid_input(format!(
                "Unsupported record type: {}",
                other
            ))),
        }
    }
}

/// Target zone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Zone name (e.g. "example.com")
    pub name: String,

    /// Optional subdomain that device records live under
    #[serde(default)]
    pub subdomain: Option<String>,

    /// TTL for created and updated records
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Which address family to publish
    #[serde(default = "default_record_type")]
    pub record_type: RecordType,

    /// Marker stored with each record this tool owns
    #[serde(default = "default_ownership_tag")]
    pub ownership_tag: String,
}

impl ZoneConfig {
    /// Create a zone configuration with defaults
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subdomain: None,
            ttl: default_ttl(),
            record_type: default_record_type(),
            ownership_tag: default_ownership_tag(),
        }
    }

    /// Place device records under a subdomain
    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Set the record TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the record type
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Set the ownership tag
    pub fn with_ownership_tag(mut self, tag: impl Into<String>) -> Self {
        self.ownership_tag = tag.into();
        self
    }

    /// Validate the zone configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        crate::names::validate_domain_name(&self.name)
            .map_err(|e| crate::Error::config(format!("Zone name: {}", e)))?;

        if let Some(sub) = &self.subdomain {
            crate::names::validate_domain_name(sub)
                .map_err(|e| crate::Error::config(format!("Subdomain: {}", e)))?;
        }

        if !(MIN_TTL..=MAX_TTL).contains(&self.ttl) {
            return Err(crate::Error::config(format!(
                "TTL must be between {} and {} seconds. Got: {}",
                MIN_TTL, MAX_TTL, self.ttl
            )));
        }

        if self.ownership_tag.trim().is_empty() {
            return Err(crate::Error::config("Ownership tag cannot be empty"));
        }

        // Cloudflare rejects comments longer than 100 characters on most plans
        if self.ownership_tag.len() > 100 {
            return Err(crate::Error::config(format!(
                "Ownership tag too long: {} chars (max 100)",
                self.ownership_tag.len()
            )));
        }

        Ok(())
    }
}

/// Lowest accepted TTL
pub const MIN_TTL: u32 = 60;

/// Highest accepted TTL
pub const MAX_TTL: u32 = 86_400;

fn default_ttl() -> u32 {
    300
}

fn default_record_type() -> RecordType {
    RecordType::A
}

fn default_ownership_tag() -> String {
    "managed-by=meshdns".to_string()
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Compute and log the plan without applying it
    #[serde(default)]
    pub dry_run: bool,

    /// Upper bound for a whole run (in seconds)
    ///
    /// Scheduled invocations are killed by their host after about 100 seconds,
    /// so the default matches that.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Capacity of the sync event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl RunnerConfig {
    /// Validate the runner configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Run timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            timeout_secs: default_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    100
}

fn default_event_channel_capacity() -> usize {
    256
}
