use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use clap::Parser;
use creditwatch::{
    compute,
    config::AppConfig,
    costsource::{CostSource, CostSourceError, HttpCostSource},
    credits::{
        BatchOrchestrator, BillingStatusController, Reconciler, StalenessFilter,
        ThresholdAlertEngine,
    },
    db::DbPool,
    expiration::ExpirationManager,
    jobs, notify, observability,
};
use tokio_util::task::TaskTracker;

#[derive(Parser, Debug)]
#[command(version, about = "Cost reconciliation and credit-limit enforcement", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "creditwatch.toml")]
    config: PathBuf,

    /// Run a single reconciliation pass and expiration sweep, then exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = if args.config.exists() {
        AppConfig::from_file(&args.config)?
    } else {
        eprintln!(
            "Config file {} not found, using defaults",
            args.config.display()
        );
        AppConfig::default()
    };

    observability::init_tracing(&config.logging);

    let db = Arc::new(DbPool::from_config(&config.database).await?);
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    let notifier = notify::from_config(&config.notifications)?;
    let compute_client = compute::from_config(&config.compute)?;

    // Without a cost source there is nothing to reconcile against.
    let cost_source: Option<Arc<dyn CostSource>> =
        match HttpCostSource::from_config(&config.cost_source) {
            Ok(source) => Some(Arc::new(source)),
            Err(CostSourceError::NotConfigured) => {
                tracing::warn!("No cost source configured; the reconciliation worker will not run");
                None
            }
            Err(e) => return Err(e.into()),
        };

    let orchestrator = cost_source.map(|source| {
        let reconciler = Reconciler::new(
            db.workspaces(),
            source,
            StalenessFilter::from_config(&config.billing),
        );
        let alerts = ThresholdAlertEngine::new(
            notifier.clone(),
            config.billing.alert_thresholds.clone(),
            config.billing.default_credit_limit,
        );
        let status = BillingStatusController::new(
            db.workspaces(),
            config.billing.credit_billing_accounts.clone(),
        );
        Arc::new(BatchOrchestrator::new(
            db.users(),
            reconciler,
            alerts,
            status,
            config.batch.effective_user_batch_size(),
            config.batch.concurrency,
        ))
    });

    let expiration_status = BillingStatusController::new(
        db.workspaces(),
        config.billing.credit_billing_accounts.clone(),
    );
    let expiration = Arc::new(ExpirationManager::new(
        db.users(),
        db.workspaces(),
        notifier.clone(),
        compute_client,
        expiration_status,
        config.expiration.clone(),
    ));

    if args.once {
        let now = Utc::now();
        if let Some(orchestrator) = &orchestrator {
            let result = orchestrator.run_once(now).await?;
            tracing::info!(
                users = result.users_processed,
                costs_updated = result.costs_updated,
                alerts_sent = result.alerts_sent,
                users_deactivated = result.users_deactivated,
                batches_failed = result.batches_failed,
                "Reconciliation pass complete"
            );
        }
        let sweep = expiration.run_sweep(now).await?;
        tracing::info!(
            users_checked = sweep.users_checked,
            warnings_sent = sweep.warnings_sent,
            users_expired = sweep.users_expired,
            errors = sweep.errors,
            "Expiration sweep complete"
        );
        return Ok(());
    }

    let tracker = TaskTracker::new();
    if let Some(orchestrator) = orchestrator {
        tracker.spawn(jobs::start_reconciliation_worker(
            orchestrator,
            config.batch.clone(),
        ));
    }
    tracker.spawn(jobs::start_expiration_worker(
        expiration,
        config.expiration.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    tracker.close();
    // Workers are pure loops; give them a moment, then drop them.
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), tracker.wait()).await;

    Ok(())
}
