//! Reconciliation between desired and actual zone state
//!
//! [`reconcile`] is a pure function: given the records the mesh says should
//! exist and the managed records the zone holds, it returns the operations
//! that turn the latter into the former.
//!
//! ```text
//! desired ∖ actual          → Create
//! desired ∩ actual, differ  → Update
//! actual ∖ desired          → Delete
//! desired ∩ actual, equal   → (nothing)
//! extra copies of a name    → Delete
//! ```
//!
//! Apart from extra copies, which are deleted by provider ID, every operation
//! targets a distinct name, so they can be applied in any order. The plan
//! still fixes one (extra copies, deletes, updates, creates, each by name) to
//! keep logs and tests deterministic.

use crate::state::{ActualState, DesiredState};
use crate::traits::DnsRecord;
use std::fmt;

/// A single change to a zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create a record that does not exist yet
    Create {
        /// The record to create
        record: DnsRecord,
    },

    /// Replace the data of an existing managed record
    Update {
        /// Current record (carries the provider ID)
        existing: DnsRecord,
        /// New data
        desired: DnsRecord,
    },

    /// Delete a managed record no device maps to any more
    Delete {
        /// The record to delete (carries the provider ID)
        record: DnsRecord,
    },
}

/// Kind of an [`Operation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Name of the record this operation targets
    pub fn name(&self) -> &str {
        match self {
            Operation::Create { record } => &record.name,
            Operation::Update { desired, .. } => &desired.name,
            Operation::Delete { record } => &record.name,
        }
    }

    /// Kind of this operation
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Create { .. } => OperationKind::Create,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Delete { .. } => OperationKind::Delete,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create { record } => {
                write!(f, "CREATE {} {}/{}", record.name, record.record_type, record.value)
            }
            Operation::Update { existing, desired } => write!(
                f,
                "UPDATE {} {}/{} -> {}/{}",
                desired.name,
                existing.record_type,
                existing.value,
                desired.record_type,
                desired.value
            ),
            Operation::Delete { record } => {
                write!(f, "DELETE {} {}/{}", record.name, record.record_type, record.value)
            }
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Ordered list of operations produced by [`reconcile`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    operations: Vec<Operation>,
    unchanged: usize,
}

impl Plan {
    /// Operations in application order
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Consume the plan, yielding its operations
    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the zone is already in sync
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of names present identically on both sides
    pub fn unchanged(&self) -> usize {
        self.unchanged
    }

    /// Number of operations of a kind
    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind() == kind).count()
    }

    /// The state that results from applying every operation to `actual`
    ///
    /// Provider IDs of created records are unknown here and stay `None`.
    pub fn apply_to(&self, actual: &ActualState) -> ActualState {
        let mut next = actual.clone();
        for op in &self.operations {
            match op {
                Operation::Create { record } => next.insert(record.clone()),
                Operation::Update { existing, desired } => {
                    let mut updated = desired.clone();
                    updated.id = existing.id.clone();
                    next.insert(updated);
                }
                Operation::Delete { record } => next.remove(record),
            }
        }
        next
    }
}

/// Compute the operations that make `actual` match `desired`
///
/// A name present on both sides is updated when its type, value or TTL
/// differ; ID and comment are not compared. Managed records that duplicate a
/// kept name are always deleted, so at most one managed record per name
/// survives the plan.
pub fn reconcile(desired: &DesiredState, actual: &ActualState) -> Plan {
    let mut deletes: Vec<Operation> = actual
        .duplicates()
        .iter()
        .map(|record| Operation::Delete {
            record: record.clone(),
        })
        .collect();
    let mut updates = Vec::new();
    let mut creates = Vec::new();
    let mut unchanged = 0;

    for (name, wanted) in desired.iter() {
        match actual.get(name) {
            None => creates.push(Operation::Create {
                record: wanted.clone(),
            }),
            Some(current) if current.same_data(wanted) => unchanged += 1,
            Some(current) => updates.push(Operation::Update {
                existing: current.clone(),
                desired: wanted.clone(),
            }),
        }
    }

    for (name, current) in actual.iter() {
        if desired.get(name).is_none() {
            deletes.push(Operation::Delete {
                record: current.clone(),
            });
        }
    }

    let mut operations = deletes;
    operations.extend(updates);
    operations.extend(creates);

    Plan {
        operations,
        unchanged,
    }
}
