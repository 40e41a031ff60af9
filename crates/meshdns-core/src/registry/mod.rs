//! Plugin-based client registry
//!
//! The registry allows DNS providers and mesh directories to be registered
//! at startup, avoiding hardcoded if-else chains in the binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meshdns_core::registry::ClientRegistry;
//!
//! let registry = ClientRegistry::new();
//! meshdns_provider_cloudflare::register(&registry);
//! meshdns_directory_tailscale::register(&registry);
//!
//! let provider = registry.create_provider(&config.provider)?;
//! let directory = registry.create_directory(&config.directory)?;
//! ```

use crate::config::{DirectoryConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::traits::{DeviceDirectory, DeviceDirectoryFactory, DnsProvider, DnsProviderFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry of client factories keyed by type name
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ClientRegistry {
    /// Registered DNS provider factories
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,

    /// Registered directory factories
    directories: RwLock<HashMap<String, Box<dyn DeviceDirectoryFactory>>>,
}

impl ClientRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "cloudflare", "dnspod")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.insert(name.into(), factory);
    }

    /// Register a mesh directory factory
    ///
    /// # Parameters
    ///
    /// - `name`: Directory type name (e.g., "tailscale")
    /// - `factory`: Factory object for creating directory instances
    pub fn register_directory(
        &self,
        name: impl Into<String>,
        factory: Box<dyn DeviceDirectoryFactory>,
    ) {
        let mut directories = self
            .directories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        directories.insert(name.into(), factory);
    }

    /// Create a DNS provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error)`: If provider type is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// Create a mesh directory from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DeviceDirectory>)`: Created directory instance
    /// - `Err(Error)`: If directory type is not registered or creation fails
    pub fn create_directory(&self, config: &DirectoryConfig) -> Result<Box<dyn DeviceDirectory>> {
        let directory_type = config.type_name();
        let directories = self
            .directories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = directories
            .get(directory_type)
            .ok_or_else(|| Error::config(format!("Unknown directory type: {}", directory_type)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.contains_key(name)
    }

    /// Check if a directory type is registered
    pub fn has_directory(&self, name: &str) -> bool {
        let directories = self
            .directories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        directories.contains_key(name)
    }
}
