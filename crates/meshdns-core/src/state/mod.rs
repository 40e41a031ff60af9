// # Zone State
//
// The two snapshots a run compares:
//
// - `DesiredState`: derived from the mesh device list
// - `ActualState`: derived from the provider's record listing, restricted
//   to records carrying the ownership tag
//
// Both are maps from fully qualified record name to record. Neither is
// persisted; every run rebuilds them from the two remote sources.

pub mod actual;
pub mod desired;

pub use actual::ActualState;
pub use desired::DesiredState;
