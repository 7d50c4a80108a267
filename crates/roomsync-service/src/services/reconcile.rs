//! Reconciliation service
//!
//! Retries what earlier events left pending: rooms that could not be
//! created or deleted, and mapping rows the provider has not confirmed yet.

use serde::Serialize;
use tracing::{info, instrument, warn};

use roomsync_core::CommunicationInstance;

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::processor::CommunicationProcessor;

/// Summary of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub processed: usize,
    pub rooms_created: usize,
    pub rooms_deleted: usize,
    pub confirmed: usize,
    pub removed: usize,
    pub still_pending: usize,
    pub failures: usize,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.still_pending == 0 && self.failures == 0
    }
}

pub struct ReconciliationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReconciliationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Run one sweep over at most `batch_size` instances
    ///
    /// A failing instance is counted and skipped; only storage errors while
    /// listing the batch abort the sweep.
    #[instrument(skip(self))]
    pub async fn run_once(&self, batch_size: i64) -> ServiceResult<ReconciliationReport> {
        let mut report = ReconciliationReport::default();
        if !self.ctx.is_enabled() {
            return Ok(report);
        }

        let instances = self
            .ctx
            .instance_repo()
            .find_needing_reconciliation(batch_size)
            .await?;

        for instance in instances {
            let id = instance.id;
            report.processed += 1;

            if let Err(e) = self.reconcile(instance, &mut report).await {
                report.failures += 1;
                warn!(instance_id = %id, code = e.error_code(), error = %e, "Reconciliation failed");
            }
        }

        if report.processed > 0 {
            info!(
                processed = report.processed,
                rooms_created = report.rooms_created,
                rooms_deleted = report.rooms_deleted,
                confirmed = report.confirmed,
                removed = report.removed,
                still_pending = report.still_pending,
                failures = report.failures,
                "Reconciliation sweep finished"
            );
        }
        Ok(report)
    }

    async fn reconcile(
        &self,
        instance: CommunicationInstance,
        report: &mut ReconciliationReport,
    ) -> ServiceResult<()> {
        // Stamp first so a failing instance moves behind the others
        self.ctx.instance_repo().mark_reconciled(instance.id).await?;

        let mut processor = CommunicationProcessor::new(self.ctx, instance);
        if processor.is_retired() {
            processor.retire().await?;
            report.rooms_deleted += 1;
            return Ok(());
        }

        let provider = processor.get_provider()?;

        if !provider.is_none() && processor.room_id().is_none() {
            let name = processor.room_name().map(str::to_string);
            let topic = processor.room_topic().map(str::to_string);
            processor.update_room(provider, name, topic).await?;
            if processor.room_id().is_some() {
                report.rooms_created += 1;
            }
        }

        let outcome = processor.sync_pending_members().await?;
        report.confirmed += outcome.confirmed;
        report.removed += outcome.removed;
        report.still_pending += outcome.still_pending;
        Ok(())
    }
}
