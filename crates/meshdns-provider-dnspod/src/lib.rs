// # DNSPod DNS Provider
//
// This crate provides a DNSPod provider for the mesh DNS sync, using the
// token-authenticated API at `dnsapi.cn`.
//
// ## Behaviour
//
// - Every call is a form-encoded POST carrying `login_token=<id>,<token>`
// - A response whose `status.code` is not `"1"` is an error
// - Records are created on the default line (`record_line_id=0`); records on
//   other lines are not listed
// - The ownership tag lives in the record remark, set with `Record.Remark`
//   right after `Record.Create`
// - DNSPod record names are relative to the domain (`@` for the apex); this
//   provider converts to and from fully qualified names
//
// ## API Reference
//
// - https://docs.dnspod.cn/api/5f561f9ee75cf42d25bf6720/

use async_trait::async_trait;
use meshdns_core::config::{DNSPOD_DEFAULT_TTL, ProviderConfig, RecordType};
use meshdns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord};
use meshdns_core::{ClientRegistry, Error, ProviderOperation, Result};
use serde::Deserialize;
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;

/// DNSPod API base URL
const DNSPOD_API_BASE: &str = "https://dnsapi.cn";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records per `Record.List` page (API maximum)
const PAGE_SIZE: usize = 3000;

/// Line ID of the default resolution line
const DEFAULT_LINE_ID: &str = "0";

const PROVIDER: &str = "dnspod";

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    info: Option<ListInfo>,
    #[serde(default)]
    records: Vec<ApiRecord>,
}

#[derive(Debug, Deserialize)]
struct ListInfo {
    #[serde(default)]
    record_total: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    record: CreatedRecord,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    value: String,
    #[serde(default)]
    ttl: Option<String>,
    #[serde(default)]
    remark: Option<String>,
    #[serde(default)]
    line_id: Option<String>,
    #[serde(default)]
    line: Option<String>,
}

impl ApiRecord {
    fn on_default_line(&self) -> bool {
        match (&self.line_id, &self.line) {
            (Some(id), _) => id == DEFAULT_LINE_ID,
            (None, Some(line)) => line == "默认" || line.eq_ignore_ascii_case("default"),
            (None, None) => true,
        }
    }

    /// Convert to a core record; non-address records yield `None`
    fn into_record(self, zone: &str) -> Option<DnsRecord> {
        if !self.on_default_line() {
            return None;
        }
        let record_type = self.record_type.parse::<RecordType>().ok()?;
        let value = match self.value.parse::<IpAddr>() {
            Ok(ip) => ip,
            Err(_) => {
                tracing::warn!(
                    "Skipping {} record {} with unparsable value '{}'",
                    self.record_type,
                    self.name,
                    self.value
                );
                return None;
            }
        };
        let ttl = self
            .ttl
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DNSPOD_DEFAULT_TTL);

        let mut record =
            DnsRecord::new(absolute_name(&self.name, zone), record_type, value, ttl).with_id(self.id);
        record.comment = self.remark.filter(|r| !r.is_empty());
        Some(record)
    }
}

/// `alice` in `example.com` → `alice.example.com`; `@` → `example.com`
fn absolute_name(relative: &str, zone: &str) -> String {
    if relative == "@" || relative.is_empty() {
        zone.to_string()
    } else {
        format!("{}.{}", relative, zone)
    }
}

/// `alice.example.com` in `example.com` → `alice`; `example.com` → `@`
fn relative_name(name: &str, zone: &str) -> Result<String> {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    let zone = zone.trim_end_matches('.').to_ascii_lowercase();

    if name == zone {
        return Ok("@".to_string());
    }
    name.strip_suffix(&format!(".{}", zone))
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_input(format!("{} is not inside zone {}", name, zone)))
}

/// DNSPod DNS provider
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct DnspodProvider {
    /// `<id>,<token>` as expected by the API
    /// ⚠️ NEVER log this value
    login_token: String,

    /// Token ID (safe to log)
    api_id: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for DnspodProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnspodProvider")
            .field("api_id", &self.api_id)
            .field("login_token", &"<REDACTED>")
            .finish()
    }
}

impl DnspodProvider {
    /// Create a new DNSPod provider
    ///
    /// # Parameters
    ///
    /// - `api_id`: API token ID
    /// - `api_token`: API token secret
    pub fn new(api_id: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        let api_id = api_id.into();
        let api_token = api_token.into();

        if api_id.is_empty() || api_token.is_empty() {
            return Err(Error::config("DNSPod API ID and token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            login_token: format!("{},{}", api_id, api_token),
            api_id,
            client,
        })
    }

    /// Call an API action and return the checked response body
    async fn request(
        &self,
        action: &str,
        params: &[(&str, String)],
        operation: ProviderOperation,
        name: &str,
    ) -> Result<Value> {
        let mut form: Vec<(&str, String)> = vec![
            ("login_token", self.login_token.clone()),
            ("format", "json".to_string()),
            ("lang", "en".to_string()),
            ("error_on_empty", "no".to_string()),
        ];
        form.extend(params.iter().cloned());

        let response = self
            .client
            .post(format!("{}/{}", DNSPOD_API_BASE, action))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                Error::provider(PROVIDER, operation, name, format!("Call DNSPod API failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::provider(
                PROVIDER,
                operation,
                name,
                format!("DNSPod API returned HTTP {}", status),
            ));
        }

        let body: Value = response.json().await.map_err(|e| {
            Error::provider(
                PROVIDER,
                operation,
                name,
                format!("DNSPod API response json decode failed: {}", e),
            )
        })?;

        check_status(body, operation, name)
    }

    async fn set_remark(&self, zone: &str, id: &str, remark: &str, name: &str) -> Result<()> {
        self.request(
            "Record.Remark",
            &[
                ("domain", zone.to_string()),
                ("record_id", id.to_string()),
                ("remark", remark.to_string()),
            ],
            ProviderOperation::Create,
            name,
        )
        .await?;
        Ok(())
    }

    fn record_params(zone: &str, record: &DnsRecord) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("domain", zone.to_string()),
            ("sub_domain", relative_name(&record.name, zone)?),
            ("record_type", record.record_type.as_str().to_string()),
            ("record_line_id", DEFAULT_LINE_ID.to_string()),
            ("value", record.value.to_string()),
            ("ttl", record.ttl.to_string()),
        ])
    }
}

/// Fail unless `status.code == "1"`
fn check_status(body: Value, operation: ProviderOperation, name: &str) -> Result<Value> {
    let status: ApiStatus = body
        .get("status")
        .cloned()
        .map(serde_json::from_value::<ApiStatus>)
        .transpose()
        .map_err(|e| {
            Error::provider(PROVIDER, operation, name, format!("Invalid status object: {}", e))
        })?
        .ok_or_else(|| {
            Error::provider(PROVIDER, operation, name, "Response has no status object")
        })?;

    if status.code != "1" {
        return Err(Error::provider(
            PROVIDER,
            operation,
            name,
            format!(
                "DNSPod API response status != 1: {}/{}",
                status.code, status.message
            ),
        ));
    }

    Ok(body)
}

/// Parse a `Record.List` page into address records and the reported total
fn parse_list(body: Value, zone: &str) -> Result<(Vec<DnsRecord>, usize, usize)> {
    let page: ListResponse = serde_json::from_value(body).map_err(|e| {
        Error::provider(
            PROVIDER,
            ProviderOperation::List,
            zone,
            format!("Invalid Record.List response: {}", e),
        )
    })?;

    let fetched = page.records.len();
    let total = page
        .info
        .and_then(|info| info.record_total)
        .and_then(|t| t.parse().ok())
        .unwrap_or(fetched);

    let records = page
        .records
        .into_iter()
        .filter_map(|r| r.into_record(zone))
        .collect();

    Ok((records, fetched, total))
}

fn record_id<'a>(record: &'a DnsRecord, operation: ProviderOperation) -> Result<&'a str> {
    record.id.as_deref().ok_or_else(|| {
        Error::provider(PROVIDER, operation, &record.name, "Record has no DNSPod ID")
    })
}

#[async_trait]
impl DnsProvider for DnspodProvider {
    async fn list_records(&self, zone: &str) -> Result<Vec<DnsRecord>> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let body = self
                .request(
                    "Record.List",
                    &[
                        ("domain", zone.to_string()),
                        ("offset", offset.to_string()),
                        ("length", PAGE_SIZE.to_string()),
                    ],
                    ProviderOperation::List,
                    zone,
                )
                .await?;

            let (page, fetched, total) = parse_list(body, zone)?;
            records.extend(page);
            offset += fetched;

            if fetched == 0 || offset >= total {
                break;
            }
        }

        tracing::debug!("Listed {} address record(s) in {}", records.len(), zone);
        Ok(records)
    }

    async fn create_record(&self, zone: &str, record: &DnsRecord) -> Result<DnsRecord> {
        let params = Self::record_params(zone, record).map_err(|e| {
            Error::provider(PROVIDER, ProviderOperation::Create, &record.name, e.to_string())
        })?;

        let body = self
            .request("Record.Create", &params, ProviderOperation::Create, &record.name)
            .await?;
        let created: CreateResponse = serde_json::from_value(body).map_err(|e| {
            Error::provider(
                PROVIDER,
                ProviderOperation::Create,
                &record.name,
                format!("Invalid Record.Create response: {}", e),
            )
        })?;
        let id = match created.record.id {
            Value::String(s) => s,
            other => other.to_string(),
        };

        if let Some(remark) = &record.comment {
            if let Err(e) = self.set_remark(zone, &id, remark, &record.name).await {
                // An untagged record would never be cleaned up; take it back out
                tracing::warn!(
                    "Tagging {} failed, removing the untagged record: {}",
                    record.name,
                    e
                );
                let untagged = record.clone().with_id(id);
                if let Err(remove_err) = self.delete_record(zone, &untagged).await {
                    tracing::error!(
                        "Untagged record {} left behind: {}",
                        record.name,
                        remove_err
                    );
                }
                return Err(e);
            }
        }

        Ok(record.clone().with_id(id))
    }

    async fn update_record(
        &self,
        zone: &str,
        existing: &DnsRecord,
        desired: &DnsRecord,
    ) -> Result<DnsRecord> {
        let id = record_id(existing, ProviderOperation::Update)?;
        let mut params = Self::record_params(zone, desired).map_err(|e| {
            Error::provider(PROVIDER, ProviderOperation::Update, &desired.name, e.to_string())
        })?;
        params.push(("record_id", id.to_string()));

        self.request("Record.Modify", &params, ProviderOperation::Update, &desired.name)
            .await?;

        Ok(desired.clone().with_id(id))
    }

    async fn delete_record(&self, zone: &str, record: &DnsRecord) -> Result<()> {
        let id = record_id(record, ProviderOperation::Delete)?;

        self.request(
            "Record.Remove",
            &[("domain", zone.to_string()), ("record_id", id.to_string())],
            ProviderOperation::Delete,
            &record.name,
        )
        .await?;

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating DNSPod providers
pub struct DnspodFactory;

impl DnsProviderFactory for DnspodFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Dnspod { api_id, api_token } => Ok(Box::new(DnspodProvider::new(
                api_id.clone(),
                api_token.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for DNSPod provider")),
        }
    }
}

/// Register the DNSPod provider with a registry
pub fn register(registry: &ClientRegistry) {
    registry.register_provider(PROVIDER, Box::new(DnspodFactory));
}
