// # Device Directory Trait
//
// Defines the interface for reading the device list of a mesh network.
//
// ## Implementations
//
// - Tailscale: `meshdns-directory-tailscale` crate
// - Future: Headscale, ZeroTier, Nebula lighthouses, etc.
//
// ## Usage
//
// ```rust,ignore
// use meshdns_core::DeviceDirectory;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let directory = /* DeviceDirectory implementation */;
//
//     for device in directory.list_devices().await? {
//         println!("{} -> {:?}", device.name, device.addresses);
//     }
//
//     Ok(())
// }
// ```

use crate::config::RecordType;
use async_trait::async_trait;
use std::fmt;
use std::net::IpAddr;

/// A device registered on the mesh network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Host label, unique within the mesh (e.g. "alice-laptop")
    pub name: String,
    /// Addresses assigned by the mesh, in provider order
    pub addresses: Vec<IpAddr>,
}

impl Device {
    /// Create a new device
    pub fn new(name: impl Into<String>, addresses: Vec<IpAddr>) -> Self {
        Self {
            name: name.into(),
            addresses,
        }
    }

    /// First address of the given family, if any
    pub fn address_for(&self, record_type: RecordType) -> Option<IpAddr> {
        self.addresses
            .iter()
            .copied()
            .find(|ip| record_type.matches(ip))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addresses: Vec<String> = self.addresses.iter().map(|ip| ip.to_string()).collect();
        write!(f, "{}[{}]", self.name, addresses.join(","))
    }
}

/// Trait for mesh directory implementations
///
/// A directory is read once per run. Implementations make the API calls
/// needed to produce the full device list and nothing else: no caching
/// between calls and no retries (the next scheduled run is the retry).
///
/// Any failure, including an expired or revoked credential, must be
/// reported as [`crate::Error::DirectoryUnavailable`] so the runner can
/// abort before touching DNS.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// List all devices currently registered on the mesh
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Device>)`: The device list (may be empty)
    /// - `Err(Error::DirectoryUnavailable)`: On network, auth or decode failure
    async fn list_devices(&self) -> Result<Vec<Device>, crate::Error>;

    /// Get the directory name (for logging/debugging)
    fn directory_name(&self) -> &'static str;
}

/// Helper trait for constructing directories from configuration
pub trait DeviceDirectoryFactory: Send + Sync {
    /// Create a DeviceDirectory instance from configuration
    fn create(
        &self,
        config: &crate::config::DirectoryConfig,
    ) -> Result<Box<dyn DeviceDirectory>, crate::Error>;
}
