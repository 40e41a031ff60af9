//! Sync runner
//!
//! The SyncRunner is responsible for one pass of:
//! - Listing devices via DeviceDirectory
//! - Listing managed records via DnsProvider
//! - Reconciling the two snapshots
//! - Applying the resulting operations via DnsProvider
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐                 ┌──────────────┐
//! │ DeviceDirectory │── Vec<Device> ─▶│              │
//! └─────────────────┘                 │              │
//!                                     │  SyncRunner  │── SyncEvent ──▶ (monitoring)
//! ┌─────────────────┐                 │              │
//! │   DnsProvider   │◀── list/apply ─▶│              │
//! └─────────────────┘                 └──────────────┘
//!                                            │
//!                                            ▼
//!                                     ┌──────────────┐
//!                                     │  reconcile() │
//!                                     └──────────────┘
//! ```
//!
//! ## Failure Model
//!
//! 1. Listing devices or records fails → the run aborts, nothing is applied
//! 2. A single operation fails → recorded in the report, the rest still run
//! 3. No retries: the next scheduled run starts from scratch

use crate::config::{SyncConfig, ZoneConfig};
use crate::error::{Error, Result};
use crate::reconcile::{Operation, OperationKind, Plan, reconcile};
use crate::state::{ActualState, DesiredState};
use crate::traits::{DeviceDirectory, DnsProvider};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted by the SyncRunner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Run started
    RunStarted {
        zone: String,
        dry_run: bool,
    },

    /// Both snapshots fetched and compared
    PlanComputed {
        devices: usize,
        desired: usize,
        actual: usize,
        operations: usize,
    },

    /// An operation was applied
    OperationApplied {
        kind: OperationKind,
        record_name: String,
    },

    /// An operation failed
    OperationFailed {
        kind: OperationKind,
        record_name: String,
        error: String,
    },

    /// Run finished (successfully or with operation failures)
    RunFinished {
        applied: usize,
        failed: usize,
    },

    /// Run aborted before applying anything
    RunAborted {
        reason: String,
    },
}

/// An operation that could not be applied
#[derive(Debug)]
pub struct OperationFailure {
    /// The operation that failed
    pub operation: Operation,
    /// Why it failed
    pub error: Error,
}

/// Outcome of one run
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Devices returned by the directory
    pub devices: usize,
    /// Records derived from the devices
    pub desired: usize,
    /// Managed records found in the zone
    pub actual: usize,
    /// Records created
    pub created: usize,
    /// Records updated
    pub updated: usize,
    /// Records deleted
    pub deleted: usize,
    /// Names already in sync
    pub unchanged: usize,
    /// Operations planned but not applied because of dry-run mode
    pub planned: Vec<Operation>,
    /// Operations that failed
    pub failures: Vec<OperationFailure>,
    /// Whether this was a dry run
    pub dry_run: bool,
}

impl SyncReport {
    /// Whether every planned operation was applied
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of operations applied
    pub fn applied(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Runs the mesh → DNS sync
///
/// ## Lifecycle
///
/// 1. Create with [`SyncRunner::new()`]
/// 2. Call [`SyncRunner::run_once()`] (or [`SyncRunner::run_with_timeout()`])
///    once per scheduled invocation
/// 3. Drop
///
/// A runner holds no state between runs; calling it again re-reads both
/// sources.
pub struct SyncRunner {
    /// Mesh directory for the device list
    directory: Box<dyn DeviceDirectory>,

    /// DNS provider for the zone
    provider: Box<dyn DnsProvider>,

    /// Target zone settings
    zone: ZoneConfig,

    /// Compute but don't apply
    dry_run: bool,

    /// Time budget for a whole run
    timeout: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncRunner {
    /// Create a new runner
    ///
    /// # Returns
    ///
    /// A tuple of (runner, event_receiver) where event_receiver yields sync events
    pub fn new(
        directory: Box<dyn DeviceDirectory>,
        provider: Box<dyn DnsProvider>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.runner.event_channel_capacity);

        let runner = Self {
            directory,
            provider,
            zone: config.zone,
            dry_run: config.runner.dry_run,
            timeout: Duration::from_secs(config.runner.timeout_secs),
            event_tx: tx,
        };

        Ok((runner, rx))
    }

    /// Run once, aborting if the configured time budget is exceeded
    ///
    /// Operations already applied when the timeout hits stay applied; the
    /// next run picks up from whatever the zone then holds.
    pub async fn run_with_timeout(&self) -> Result<SyncReport> {
        match tokio::time::timeout(self.timeout, self.run_once()).await {
            Ok(result) => result,
            Err(_) => {
                let err = Error::Timeout(self.timeout.as_secs());
                error!("{}", err);
                self.emit_event(SyncEvent::RunAborted {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Run one full sync pass
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: Both sources were read; the report lists any
    ///   operations that failed
    /// - `Err(Error)`: A source could not be read; nothing was applied
    pub async fn run_once(&self) -> Result<SyncReport> {
        self.emit_event(SyncEvent::RunStarted {
            zone: self.zone.name.clone(),
            dry_run: self.dry_run,
        });

        let (plan, mut report) = match self.plan().await {
            Ok(planned) => planned,
            Err(e) => {
                error!("Aborting sync, nothing applied: {}", e);
                self.emit_event(SyncEvent::RunAborted {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        if plan.is_empty() {
            info!(
                "Zone {} in sync ({} record(s) unchanged)",
                self.zone.name, report.unchanged
            );
        }

        if self.dry_run {
            for op in plan.operations() {
                info!("[DRY-RUN] Would {}", op);
            }
            report.planned = plan.into_operations();
        } else {
            for op in plan.into_operations() {
                self.apply(op, &mut report).await;
            }
        }

        info!(
            "Sync finished: {} created, {} updated, {} deleted, {} unchanged, {} failed",
            report.created,
            report.updated,
            report.deleted,
            report.unchanged,
            report.failures.len()
        );
        self.emit_event(SyncEvent::RunFinished {
            applied: report.applied(),
            failed: report.failures.len(),
        });

        Ok(report)
    }

    /// Fetch both snapshots and reconcile them
    async fn plan(&self) -> Result<(Plan, SyncReport)> {
        let devices = self.directory.list_devices().await.map_err(|e| match e {
            Error::DirectoryUnavailable(_) => e,
            other => Error::directory(other.to_string()),
        })?;
        debug!(
            "{} returned {} device(s)",
            self.directory.directory_name(),
            devices.len()
        );

        let listing = self.provider.list_records(&self.zone.name).await?;
        debug!(
            "{} returned {} address record(s) for {}",
            self.provider.provider_name(),
            listing.len(),
            self.zone.name
        );

        let desired = DesiredState::from_devices(&devices, &self.zone);
        let actual = ActualState::from_records(listing, &self.zone);
        let plan = reconcile(&desired, &actual);

        self.emit_event(SyncEvent::PlanComputed {
            devices: devices.len(),
            desired: desired.len(),
            actual: actual.len(),
            operations: plan.len(),
        });

        let report = SyncReport {
            devices: devices.len(),
            desired: desired.len(),
            actual: actual.len(),
            unchanged: plan.unchanged(),
            dry_run: self.dry_run,
            ..SyncReport::default()
        };

        Ok((plan, report))
    }

    /// Apply one operation, recording the outcome in the report
    async fn apply(&self, op: Operation, report: &mut SyncReport) {
        let zone = self.zone.name.as_str();
        let result = match &op {
            Operation::Create { record } => {
                self.provider.create_record(zone, record).await.map(|_| ())
            }
            Operation::Update { existing, desired } => self
                .provider
                .update_record(zone, existing, desired)
                .await
                .map(|_| ()),
            Operation::Delete { record } => self.provider.delete_record(zone, record).await,
        };

        let kind = op.kind();
        let record_name = op.name().to_string();

        match result {
            Ok(()) => {
                info!("Applied {}", op);
                match kind {
                    OperationKind::Create => report.created += 1,
                    OperationKind::Update => report.updated += 1,
                    OperationKind::Delete => report.deleted += 1,
                }
                self.emit_event(SyncEvent::OperationApplied { kind, record_name });
            }
            Err(e) => {
                // Operations target distinct names; keep going
                error!("Failed to {}: {}", op, e);
                self.emit_event(SyncEvent::OperationFailed {
                    kind,
                    record_name,
                    error: e.to_string(),
                });
                report.failures.push(OperationFailure {
                    operation: op,
                    error: e,
                });
            }
        }
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
