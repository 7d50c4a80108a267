//! # roomsync-reconciler
//!
//! Periodic sweep retrying room creation and pending memberships.

use std::sync::Arc;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use roomsync_common::{AppConfig, AppError, ReconcileConfig};
use roomsync_db::{create_pool, run_migrations, MemoryDirectory, PgInstanceRepository, PgMappingRepository};
use roomsync_provider::ProviderRegistry;
use roomsync_service::{ReconciliationService, ServiceContext, ServiceContextBuilder};

/// Wire the storage and providers the sweep needs
pub async fn create_context(config: &AppConfig) -> Result<ServiceContext, AppError> {
    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&roomsync_db::DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    let providers = ProviderRegistry::from_config(config)?;
    info!(providers = ?providers.registered(), "Room providers registered");

    ServiceContextBuilder::new()
        .communication(config.communication.clone())
        .instance_repo(Arc::new(PgInstanceRepository::new(pool.clone())))
        .mapping_repo(Arc::new(PgMappingRepository::new(pool)))
        // The sweep only works from stored state and never asks the host
        .directory(Arc::new(MemoryDirectory::new()))
        .providers(providers)
        .build()
        .map_err(|e| AppError::Config(e.to_string()))
}

/// Sweep until `shutdown` resolves
pub async fn run_loop<F>(ctx: &ServiceContext, config: &ReconcileConfig, shutdown: F)
where
    F: std::future::Future<Output = ()>,
{
    let service = ReconciliationService::new(ctx);
    let mut ticker = interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                match service.run_once(config.batch_size).await {
                    Ok(report) if !report.is_clean() => {
                        warn!(report = %serde_json::to_string(&report).unwrap_or_default(), "Work left pending");
                    }
                    Ok(_) => {}
                    Err(e) => error!(code = e.error_code(), error = %e, "Reconciliation sweep failed"),
                }
            }
        }
    }
}

/// Run the worker with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    if !config.communication.enabled {
        info!("Communication is disabled, nothing to reconcile");
        return Ok(());
    }

    let ctx = create_context(&config).await?;

    info!(
        interval_secs = config.reconcile.interval_secs,
        batch_size = config.reconcile.batch_size,
        "Reconciler started"
    );

    run_loop(&ctx, &config.reconcile, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await;

    info!("Reconciler stopped");
    Ok(())
}
