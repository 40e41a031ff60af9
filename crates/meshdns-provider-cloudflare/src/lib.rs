// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider for the mesh DNS sync.
//
// ## Implementation Status
//
// - ✅ Paginated listing of A/AAAA records with their comments
// - ✅ Create, update (PUT) and delete by record ID
// - ✅ Ownership tag stored in the record `comment` field
// - ✅ Zone ID configured explicitly or looked up once by zone name
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error messages for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - ❌ NO retry logic (the next scheduled run retries)
// - ❌ NO dry-run handling (owned by SyncRunner)
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - API token MUST be provided via environment variables only
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=N&per_page=100`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Overwrite DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use meshdns_core::config::{ProviderConfig, RecordType};
use meshdns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord};
use meshdns_core::{ClientRegistry, Error, ProviderOperation, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records per listing page
const PAGE_SIZE: u32 = 100;

const PROVIDER: &str = "cloudflare";

/// Standard Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ApiZone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    #[serde(default)]
    ttl: u32,
    #[serde(default)]
    comment: Option<String>,
}

impl ApiRecord {
    /// Convert to a core record; non-address records yield `None`
    fn into_record(self) -> Option<DnsRecord> {
        let record_type = self.record_type.parse::<RecordType>().ok()?;
        let value = match self.content.parse::<IpAddr>() {
            Ok(ip) => ip,
            Err(_) => {
                tracing::warn!(
                    "Skipping {} record {} with unparsable content '{}'",
                    self.record_type,
                    self.name,
                    self.content
                );
                return None;
            }
        };

        let mut record = DnsRecord::new(self.name, record_type, value, self.ttl).with_id(self.id);
        record.comment = self.comment;
        Some(record)
    }
}

/// Cloudflare DNS provider
///
/// # Trust Level: Untrusted
///
/// This provider is isolated and stateless apart from the zone ID it looks
/// up once. All coordination (planning, dry-run, scheduling) is owned by
/// `SyncRunner`.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID (configured, or resolved on first use)
    zone_id: OnceCell<String>,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id.get())
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (looked up by zone name when absent)
    ///
    /// # Security
    ///
    /// The API token will NEVER be logged or displayed in error messages.
    pub fn new(api_token: impl Into<String>, zone_id: Option<String>) -> Result<Self> {
        let api_token = api_token.into();

        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let cell = OnceCell::new();
        if let Some(id) = zone_id.filter(|id| !id.is_empty()) {
            // A fresh cell is never already set
            let _ = cell.set(id);
        }

        Ok(Self {
            api_token,
            zone_id: cell,
            client,
        })
    }

    /// Get the zone ID for a zone name
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn zone_id(&self, zone: &str) -> Result<&str> {
        let id = self
            .zone_id
            .get_or_try_init(|| async {
                tracing::debug!("Looking up zone ID for {}", zone);

                let url = format!("{}/zones?name={}", CLOUDFLARE_API_BASE, zone);
                let (zones, _): (Vec<ApiZone>, u32) = self
                    .send(self.client.get(&url), ProviderOperation::List, zone)
                    .await?;

                let id = zones.into_iter().next().map(|z| z.id).ok_or_else(|| {
                    Error::provider(
                        PROVIDER,
                        ProviderOperation::List,
                        zone,
                        "Zone not found in this account",
                    )
                })?;

                tracing::debug!("Found zone ID: {}", id);
                Ok::<String, Error>(id)
            })
            .await?;

        Ok(id.as_str())
    }

    /// Send a request and unwrap the response envelope
    ///
    /// Returns the result and the total page count (1 when not paginated).
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: ProviderOperation,
        name: &str,
    ) -> Result<(T, u32)> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                Error::provider(PROVIDER, operation, name, format!("HTTP request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status.as_u16(), &error_text, operation, name));
        }

        let body: Value = response.json().await.map_err(|e| {
            Error::provider(PROVIDER, operation, name, format!("Failed to parse response: {}", e))
        })?;

        unwrap_envelope(body, operation, name)
    }

    fn record_body(record: &DnsRecord) -> Value {
        json!({
            "type": record.record_type.as_str(),
            "name": record.name,
            "content": record.value.to_string(),
            "ttl": record.ttl,
            "proxied": false,
            "comment": record.comment,
        })
    }
}

/// Map a non-success HTTP status to a provider error
fn status_error(status: u16, body: &str, operation: ProviderOperation, name: &str) -> Error {
    let message = match status {
        401 | 403 => format!(
            "Authentication failed: Invalid API token or insufficient permissions. Status: {}",
            status
        ),
        404 => format!("Not found. Status: {}", status),
        409 => format!(
            "Conflict: Record is being changed by another process or already exists. Status: {}",
            status
        ),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!("Cloudflare server error (transient): {} - {}", status, body),
        _ => format!("Request failed: {} - {}", status, body),
    };
    Error::provider(PROVIDER, operation, name, message)
}

/// Check `success` and extract `result` from a response body
fn unwrap_envelope<T: DeserializeOwned>(
    body: Value,
    operation: ProviderOperation,
    name: &str,
) -> Result<(T, u32)> {
    let envelope: Envelope<T> = serde_json::from_value(body).map_err(|e| {
        Error::provider(PROVIDER, operation, name, format!("Invalid response format: {}", e))
    })?;

    if !envelope.success {
        let messages: Vec<String> = envelope
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.code, e.message))
            .collect();
        return Err(Error::provider(
            PROVIDER,
            operation,
            name,
            format!("API reported failure: {}", messages.join("; ")),
        ));
    }

    let result = envelope.result.ok_or_else(|| {
        Error::provider(PROVIDER, operation, name, "Invalid response format: missing result")
    })?;
    let pages = envelope
        .result_info
        .map(|info| info.total_pages.max(1))
        .unwrap_or(1);

    Ok((result, pages))
}

/// Keep the address records of a listing page
fn address_records(page: Vec<ApiRecord>) -> impl Iterator<Item = DnsRecord> {
    page.into_iter().filter_map(ApiRecord::into_record)
}

fn record_id<'a>(record: &'a DnsRecord, operation: ProviderOperation) -> Result<&'a str> {
    record.id.as_deref().ok_or_else(|| {
        Error::provider(PROVIDER, operation, &record.name, "Record has no Cloudflare ID")
    })
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_records(&self, zone: &str) -> Result<Vec<DnsRecord>> {
        let zone_id = self.zone_id(zone).await?;
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let url = format!(
                "{}/zones/{}/dns_records?page={}&per_page={}",
                CLOUDFLARE_API_BASE, zone_id, page, PAGE_SIZE
            );
            let (items, total_pages): (Vec<ApiRecord>, u32) = self
                .send(self.client.get(&url), ProviderOperation::List, zone)
                .await?;

            records.extend(address_records(items));

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("Listed {} address record(s) in {}", records.len(), zone);
        Ok(records)
    }

    async fn create_record(&self, zone: &str, record: &DnsRecord) -> Result<DnsRecord> {
        let zone_id = self.zone_id(zone).await?;
        let url = format!("{}/zones/{}/dns_records", CLOUDFLARE_API_BASE, zone_id);

        let (created, _): (ApiRecord, u32) = self
            .send(
                self.client.post(&url).json(&Self::record_body(record)),
                ProviderOperation::Create,
                &record.name,
            )
            .await?;

        tracing::debug!("Created Cloudflare record {} ({})", record.name, created.id);
        Ok(record.clone().with_id(created.id))
    }

    async fn update_record(
        &self,
        zone: &str,
        existing: &DnsRecord,
        desired: &DnsRecord,
    ) -> Result<DnsRecord> {
        let zone_id = self.zone_id(zone).await?;
        let id = record_id(existing, ProviderOperation::Update)?;
        let url = format!("{}/zones/{}/dns_records/{}", CLOUDFLARE_API_BASE, zone_id, id);

        let (_, _): (Value, u32) = self
            .send(
                self.client.put(&url).json(&Self::record_body(desired)),
                ProviderOperation::Update,
                &desired.name,
            )
            .await?;

        Ok(desired.clone().with_id(id))
    }

    async fn delete_record(&self, zone: &str, record: &DnsRecord) -> Result<()> {
        let zone_id = self.zone_id(zone).await?;
        let id = record_id(record, ProviderOperation::Delete)?;
        let url = format!("{}/zones/{}/dns_records/{}", CLOUDFLARE_API_BASE, zone_id, id);

        let (_, _): (Value, u32) = self
            .send(self.client.delete(&url), ProviderOperation::Delete, &record.name)
            .await?;

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare { api_token, zone_id } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }
                Ok(Box::new(CloudflareProvider::new(
                    api_token.clone(),
                    zone_id.clone(),
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
pub fn register(registry: &ClientRegistry) {
    registry.register_provider(PROVIDER, Box::new(CloudflareFactory));
}
