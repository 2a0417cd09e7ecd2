//! Stale-record cleanup reporting.
//!
//! Deliberately read-only: the body counts what would be archived and reports
//! it, leaving the records in place. Actual archival stays a manual decision.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use medflow_billing::InvoiceStatus;
use medflow_scheduling::AppointmentStatus;

use crate::jobs::{JobContext, JobEngine, JobError, JobId};
use crate::store::UnitOfWork;

use super::{BulkAbort, BulkOperationResult, ensure_not_cancelled};

/// Count completed appointments older than `cutoff` and their paid invoices.
pub async fn cleanup_stale_records(
    ctx: &JobContext,
    cutoff: DateTime<Utc>,
) -> Result<BulkOperationResult, JobError> {
    let mut result = BulkOperationResult::started("DataCleanup");
    let mut uow = ctx.unit_of_work();
    info!(%cutoff, "starting data cleanup");

    match survey(&mut uow, ctx, cutoff, &mut result).await {
        Ok(data) => {
            info!(total = result.success_count, "data cleanup completed");
            let processed = result.success_count;
            Ok(result.succeeded(processed, Some(data)))
        }
        Err(BulkAbort::Cancelled) => {
            warn!("data cleanup cancelled");
            Err(JobError::Cancelled)
        }
        Err(BulkAbort::Infra(err)) => {
            error!(error = %err, "data cleanup failed, rolling back");
            uow.rollback_transaction();
            Ok(result.failed(err.to_string()))
        }
    }
}

async fn survey(
    uow: &mut UnitOfWork,
    ctx: &JobContext,
    cutoff: DateTime<Utc>,
    result: &mut BulkOperationResult,
) -> Result<serde_json::Value, BulkAbort> {
    uow.begin_transaction()?;
    ensure_not_cancelled(ctx)?;

    let stale_appointments = uow
        .appointments()
        .find(|a| a.scheduled_at < cutoff && a.status == AppointmentStatus::Completed);
    let stale_ids: HashSet<_> = stale_appointments.iter().map(|a| a.id).collect();

    let paid_invoices = uow
        .invoices()
        .find(|i| stale_ids.contains(&i.appointment_id) && i.status == InvoiceStatus::Paid);

    info!(
        appointments = stale_appointments.len(),
        invoices = paid_invoices.len(),
        "stale records eligible for archival"
    );

    uow.commit_transaction().await?;

    result.success_count = stale_appointments.len() + paid_invoices.len();
    Ok(serde_json::json!({
        "stale_appointments": stale_appointments.len(),
        "paid_invoices": paid_invoices.len(),
    }))
}

/// Queue a data cleanup run on `engine`.
pub fn submit_cleanup(engine: &JobEngine, cutoff: DateTime<Utc>) -> JobId {
    let name = format!("DataCleanup-{}", Utc::now().format("%Y%m%d-%H%M%S"));
    engine.submit(name, move |ctx| async move {
        let result = cleanup_stale_records(&ctx, cutoff).await?;
        Ok(serde_json::to_value(result)?)
    })
}
