//! Background workers driving reconciliation and expiration.
//!
//! Each worker is a loop around a single-pass function, gated by its
//! config section and spawned on the binary's task tracker. Passes run
//! strictly one at a time per worker; overlap control across replicas
//! is the deployment's responsibility.

use std::{sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
    config::{BatchConfig, ExpirationConfig},
    credits::BatchOrchestrator,
    expiration::ExpirationManager,
};

/// Starts the cost reconciliation worker as a background task.
///
/// Runs a full reconcile → alert → deactivate pass over all users at
/// the configured interval, indefinitely until the task is cancelled.
pub async fn start_reconciliation_worker(orchestrator: Arc<BatchOrchestrator>, config: BatchConfig) {
    if !config.enabled {
        tracing::info!("Reconciliation worker disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.interval_secs,
        user_batch_size = config.effective_user_batch_size(),
        concurrency = config.concurrency,
        "Starting reconciliation worker"
    );

    let interval = Duration::from_secs(config.interval_secs);

    loop {
        match orchestrator.run_once(Utc::now()).await {
            Ok(result) => {
                if result.has_changes() || result.batches_failed > 0 {
                    tracing::info!(
                        users = result.users_processed,
                        batches = result.batches,
                        batches_failed = result.batches_failed,
                        costs_updated = result.costs_updated,
                        alerts_sent = result.alerts_sent,
                        users_deactivated = result.users_deactivated,
                        workspaces_deactivated = result.workspaces_deactivated,
                        duration_ms = result.duration_ms,
                        "Reconciliation run complete"
                    );
                } else {
                    tracing::debug!(
                        users = result.users_processed,
                        duration_ms = result.duration_ms,
                        "Reconciliation run complete, no changes"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error running reconciliation");
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Starts the credit expiration worker as a background task.
pub async fn start_expiration_worker(manager: Arc<ExpirationManager>, config: ExpirationConfig) {
    if !config.enabled {
        tracing::info!("Expiration worker disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.interval_secs,
        warning_days = config.warning_days,
        "Starting expiration worker"
    );

    let interval = Duration::from_secs(config.interval_secs);

    loop {
        match manager.run_sweep(Utc::now()).await {
            Ok(result) => {
                if result.has_changes() || result.errors > 0 {
                    tracing::info!(
                        users_checked = result.users_checked,
                        warnings_sent = result.warnings_sent,
                        users_expired = result.users_expired,
                        errors = result.errors,
                        "Expiration sweep complete"
                    );
                } else {
                    tracing::debug!(
                        users_checked = result.users_checked,
                        "Expiration sweep complete, no changes"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error running expiration sweep");
            }
        }

        tokio::time::sleep(interval).await;
    }
}
