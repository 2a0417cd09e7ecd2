//! Bulk invoice generation for completed appointments.

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use medflow_billing::Invoice;
use medflow_core::AppointmentId;
use medflow_scheduling::AppointmentStatus;

use crate::jobs::{JobContext, JobEngine, JobError, JobId};
use crate::store::UnitOfWork;

use super::{BATCH_SIZE, BulkAbort, BulkOperationResult, ensure_not_cancelled};

/// Default invoice amount in smallest currency unit (150.00).
pub const DEFAULT_INVOICE_AMOUNT_CENTS: u64 = 15_000;

/// Days until a generated invoice falls due.
const DUE_IN_DAYS: i64 = 30;

/// Generate a pending invoice for every completed appointment in
/// `appointment_ids` that does not have one yet.
pub async fn generate_invoices(
    ctx: &JobContext,
    appointment_ids: &[AppointmentId],
    default_amount_cents: u64,
) -> Result<BulkOperationResult, JobError> {
    let mut result = BulkOperationResult::started("BulkGenerateInvoices");
    let mut uow = ctx.unit_of_work();
    info!(
        count = appointment_ids.len(),
        "starting bulk invoice generation"
    );

    match stage_invoices(
        &mut uow,
        ctx,
        appointment_ids,
        default_amount_cents,
        &mut result,
    )
    .await
    {
        Ok(data) => {
            info!(
                generated = result.success_count,
                total = appointment_ids.len(),
                "bulk invoice generation completed"
            );
            Ok(result.succeeded(appointment_ids.len(), Some(data)))
        }
        Err(BulkAbort::Cancelled) => {
            warn!("bulk invoice generation cancelled");
            Err(JobError::Cancelled)
        }
        Err(BulkAbort::Infra(err)) => {
            error!(error = %err, "bulk invoice generation failed, rolling back");
            uow.rollback_transaction();
            Ok(result.failed(err.to_string()))
        }
    }
}

async fn stage_invoices(
    uow: &mut UnitOfWork,
    ctx: &JobContext,
    appointment_ids: &[AppointmentId],
    default_amount_cents: u64,
    result: &mut BulkOperationResult,
) -> Result<serde_json::Value, BulkAbort> {
    uow.begin_transaction()?;
    let appointments = uow.appointments();
    let invoices = uow.invoices();
    let mut generated = Vec::new();

    for batch in appointment_ids.chunks(BATCH_SIZE) {
        ensure_not_cancelled(ctx)?;

        for &appointment_id in batch {
            let Some(appointment) = appointments.get_by_id(appointment_id) else {
                result
                    .errors
                    .push(format!("Appointment {appointment_id} not found"));
                continue;
            };
            if appointment.status != AppointmentStatus::Completed {
                result
                    .errors
                    .push(format!("Appointment {appointment_id} is not completed"));
                continue;
            }
            if invoices
                .first_or_default(|i| i.appointment_id == appointment_id)
                .is_some()
            {
                result.errors.push(format!(
                    "Invoice already exists for appointment {appointment_id}"
                ));
                continue;
            }

            let invoice = Invoice::new(
                appointment_id,
                appointment.patient_id,
                default_amount_cents,
                Utc::now() + Duration::days(DUE_IN_DAYS),
            );
            let invoice = invoices.add(invoice).await?;
            generated.push(serde_json::json!({
                "id": invoice.id,
                "appointment_id": invoice.appointment_id,
                "amount_cents": invoice.amount_cents,
            }));
            result.success_count += 1;
        }

        uow.save_changes().await?;
        debug!(batch = batch.len(), "processed invoice batch");
    }

    uow.commit_transaction().await?;
    Ok(serde_json::Value::Array(generated))
}

/// Queue a bulk invoice generation on `engine`.
pub fn submit_invoice_generation(
    engine: &JobEngine,
    appointment_ids: Vec<AppointmentId>,
    default_amount_cents: u64,
) -> JobId {
    let name = format!(
        "BulkGenerateInvoices-{}-{}",
        appointment_ids.len(),
        Utc::now().format("%Y%m%d-%H%M%S")
    );
    engine.submit(name, move |ctx| async move {
        let result = generate_invoices(&ctx, &appointment_ids, default_amount_cents).await?;
        Ok(serde_json::to_value(result)?)
    })
}
