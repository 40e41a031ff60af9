//! Core traits for the mesh DNS sync
//!
//! This module defines the abstract interfaces that all clients must follow.
//!
//! - [`DeviceDirectory`]: List the devices of a mesh network
//! - [`DnsProvider`]: Read and modify records in a DNS zone

pub mod device_directory;
pub mod dns_provider;

pub use device_directory::{Device, DeviceDirectory, DeviceDirectoryFactory};
pub use dns_provider::{DnsProvider, DnsProviderFactory, DnsRecord};
