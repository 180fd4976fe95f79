//! The cost reconciliation and alerting engine.
//!
//! A reconciliation run flows bottom-up through these modules: the
//! batch orchestrator partitions users, the reconciler refreshes stale
//! cached costs from the cost source and assembles per-user aggregates,
//! the alert engine sends threshold and exhaustion notices, and the
//! status controller disables billing access for exhausted users.

pub mod aggregate;
pub mod alerts;
pub mod batch;
pub mod compare;
pub mod reconciler;
pub mod staleness;
pub mod status;

pub use aggregate::{AggregateCostView, UserCostSnapshot};
pub use alerts::ThresholdAlertEngine;
pub use batch::{BatchOrchestrator, ReconciliationRunResult};
pub use reconciler::{BatchReconcileOutcome, Reconciler};
pub use staleness::StalenessFilter;
pub use status::BillingStatusController;

use crate::{costsource::CostSourceError, db::DbError};

/// Errors that abort a reconciliation batch.
///
/// Notification and compute failures never surface here; they are
/// logged where they occur and the batch continues.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    CostSource(#[from] CostSourceError),
}
