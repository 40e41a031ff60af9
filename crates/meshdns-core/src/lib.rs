// # meshdns-core
//
// Core library for publishing mesh network devices into a public DNS zone.
//
// ## Architecture Overview
//
// - **DeviceDirectory**: Trait for listing the devices of a mesh network
// - **DnsProvider**: Trait for listing and changing records in a DNS zone
// - **DesiredState / ActualState**: The two snapshots a run compares
// - **reconcile**: Pure diff producing create/update/delete operations
// - **SyncRunner**: One sequential pass: list, list, reconcile, apply
// - **ClientRegistry**: Plugin-based registry for directories and providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from API clients
// 2. **Stateless Runs**: Every run re-derives everything from the two remote sources
// 3. **Ownership Tagging**: Only records carrying the ownership tag are ever touched
// 4. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod error;
pub mod names;
pub mod reconcile;
pub mod registry;
pub mod runner;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{DirectoryConfig, ProviderConfig, RecordType, RunnerConfig, SyncConfig, ZoneConfig};
pub use error::{Error, ProviderOperation, Result};
pub use reconcile::{Operation, OperationKind, Plan, reconcile};
pub use registry::ClientRegistry;
pub use runner::{OperationFailure, SyncEvent, SyncReport, SyncRunner};
pub use state::{ActualState, DesiredState};
pub use traits::{Device, DeviceDirectory, DnsProvider, DnsRecord};
