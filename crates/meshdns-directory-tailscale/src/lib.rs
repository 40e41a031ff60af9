// # Tailscale Device Directory
//
// This crate lists the devices of a tailnet through the Tailscale API v2.
//
// ## Architecture
//
// One `GET /api/v2/tailnet/{tailnet}/devices` per run, authenticated with an
// API key as the basic-auth user name. No caching, no retries: a failed call
// is reported as `DirectoryUnavailable` and the next scheduled run tries
// again.
//
// ## Credentials
//
// Tailscale API keys expire after 90 days. Renewal is an operational task;
// an expired key shows up here as an authentication failure.
//
// ## API Reference
//
// - https://tailscale.com/api#tag/devices/GET/tailnet/{tailnet}/devices

use meshdns_core::ClientRegistry;
use meshdns_core::config::DirectoryConfig;
use meshdns_core::traits::{Device, DeviceDirectory, DeviceDirectoryFactory};
use meshdns_core::{Error, Result};

use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

/// Tailscale API base URL
const TAILSCALE_API_BASE: &str = "https://api.tailscale.com/api/v2";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Device list response
#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<ApiDevice>,
}

/// A device as returned by the API (only the fields we use)
#[derive(Debug, Deserialize)]
struct ApiDevice {
    /// MagicDNS name, e.g. "laptop.tail1234.ts.net" or "laptop.user.gmail.com"
    name: String,
    /// Tailscale addresses (100.x.y.z and fd7a:115c:a1e0::/48)
    #[serde(default)]
    addresses: Vec<String>,
}

/// Tailscale-backed device directory
pub struct TailscaleDirectory {
    /// Tailnet name (e.g. "user@gmail.com" or "example.com")
    tailnet: String,

    /// API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for TailscaleDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailscaleDirectory")
            .field("tailnet", &self.tailnet)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl TailscaleDirectory {
    /// Create a new Tailscale directory
    ///
    /// # Parameters
    ///
    /// - `tailnet`: Tailnet name as shown in the admin panel
    /// - `api_key`: API key generated on the admin panel's Keys page
    pub fn new(tailnet: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let tailnet = tailnet.into();
        let api_key = api_key.into();

        if tailnet.is_empty() {
            return Err(Error::config("Tailscale tailnet cannot be empty"));
        }
        if api_key.is_empty() {
            return Err(Error::config("Tailscale API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            tailnet,
            api_key,
            client,
        })
    }
}

#[async_trait::async_trait]
impl DeviceDirectory for TailscaleDirectory {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        let url = format!("{}/tailnet/{}/devices", TAILSCALE_API_BASE, self.tailnet);
        tracing::debug!("Listing devices of tailnet {}", self.tailnet);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await
            .map_err(|e| Error::directory(format!("Call Tailscale API failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => Error::directory(format!(
                    "Tailscale authentication failed ({}). API keys expire after 90 days; \
                    generate a new one on the admin panel's Keys page.",
                    status
                )),
                404 => Error::directory(format!("Tailnet not found: {}", self.tailnet)),
                429 => Error::directory(format!("Tailscale rate limit exceeded ({})", status)),
                _ => Error::directory(format!("Tailscale API returned {}", status)),
            });
        }

        let body: DevicesResponse = response.json().await.map_err(|e| {
            Error::directory(format!("Tailscale API response decode failed: {}", e))
        })?;

        let devices = convert_devices(body, &self.tailnet);
        tracing::info!(
            "Tailnet {} has {} device(s)",
            self.tailnet,
            devices.len()
        );
        Ok(devices)
    }

    fn directory_name(&self) -> &'static str {
        "tailscale"
    }
}

/// Turn the API response into devices
fn convert_devices(body: DevicesResponse, tailnet: &str) -> Vec<Device> {
    body.devices
        .into_iter()
        .map(|d| {
            let addresses = d
                .addresses
                .iter()
                .filter_map(|a| match a.parse::<IpAddr>() {
                    Ok(ip) => Some(ip),
                    Err(_) => {
                        tracing::warn!("Device {} has unparsable address '{}'", d.name, a);
                        None
                    }
                })
                .collect();
            Device::new(host_label(&d.name, tailnet), addresses)
        })
        .collect()
}

/// Derive the short host name from a MagicDNS name
///
/// Legacy tailnets name devices `<host>.<tailnet with '@' as '.'>`, e.g.
/// `laptop.user.gmail.com` for tailnet `user@gmail.com`; that suffix is
/// stripped. Anything else (e.g. `laptop.tail1234.ts.net`) keeps only its
/// first label.
fn host_label(name: &str, tailnet: &str) -> String {
    let name = name.trim_end_matches('.');
    let suffix = format!(".{}", tailnet.replace('@', "."));

    match name.strip_suffix(&suffix) {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => name.split('.').next().unwrap_or(name).to_string(),
    }
}

/// Factory for creating Tailscale directories
pub struct TailscaleFactory;

impl DeviceDirectoryFactory for TailscaleFactory {
    fn create(&self, config: &DirectoryConfig) -> Result<Box<dyn DeviceDirectory>> {
        match config {
            DirectoryConfig::Tailscale { tailnet, api_key } => Ok(Box::new(
                TailscaleDirectory::new(tailnet.clone(), api_key.clone())?,
            )),
        }
    }
}

/// Register the Tailscale directory with a registry
pub fn register(registry: &ClientRegistry) {
    registry.register_directory("tailscale", Box::new(TailscaleFactory));
}
