//! Bulk payment processing for pending invoices.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use medflow_billing::{InvoiceStatus, Payment};
use medflow_core::InvoiceId;

use crate::jobs::{JobContext, JobEngine, JobError, JobId};
use crate::store::UnitOfWork;

use super::{BATCH_SIZE, BulkAbort, BulkOperationResult, ensure_not_cancelled};

/// Method label recorded on payments created by the bulk run.
pub const DEFAULT_PAYMENT_METHOD: &str = "BulkPayment";

/// Settle every pending invoice in `invoice_ids` that has no payment yet:
/// a payment for the invoice total is created and the invoice marked paid.
pub async fn process_payments(
    ctx: &JobContext,
    invoice_ids: &[InvoiceId],
    payment_method: &str,
) -> Result<BulkOperationResult, JobError> {
    let mut result = BulkOperationResult::started("BulkProcessPayments");
    let mut uow = ctx.unit_of_work();
    info!(count = invoice_ids.len(), "starting bulk payment processing");

    match stage_payments(&mut uow, ctx, invoice_ids, payment_method, &mut result).await {
        Ok(data) => {
            info!(
                processed = result.success_count,
                total = invoice_ids.len(),
                "bulk payment processing completed"
            );
            Ok(result.succeeded(invoice_ids.len(), Some(data)))
        }
        Err(BulkAbort::Cancelled) => {
            warn!("bulk payment processing cancelled");
            Err(JobError::Cancelled)
        }
        Err(BulkAbort::Infra(err)) => {
            error!(error = %err, "bulk payment processing failed, rolling back");
            uow.rollback_transaction();
            Ok(result.failed(err.to_string()))
        }
    }
}

async fn stage_payments(
    uow: &mut UnitOfWork,
    ctx: &JobContext,
    invoice_ids: &[InvoiceId],
    payment_method: &str,
    result: &mut BulkOperationResult,
) -> Result<serde_json::Value, BulkAbort> {
    uow.begin_transaction()?;
    let invoices = uow.invoices();
    let payments = uow.payments();
    let mut processed = Vec::new();

    for batch in invoice_ids.chunks(BATCH_SIZE) {
        ensure_not_cancelled(ctx)?;

        for &invoice_id in batch {
            let Some(mut invoice) = invoices.get_by_id(invoice_id) else {
                result.errors.push(format!("Invoice {invoice_id} not found"));
                continue;
            };
            if invoice.status != InvoiceStatus::Pending {
                result
                    .errors
                    .push(format!("Invoice {invoice_id} is not in pending status"));
                continue;
            }
            if payments
                .first_or_default(|p| p.invoice_id == invoice_id)
                .is_some()
            {
                result
                    .errors
                    .push(format!("Payment already exists for invoice {invoice_id}"));
                continue;
            }

            let payment = Payment::new(invoice_id, invoice.total_cents(), payment_method);
            let payment = payments.add(payment).await?;

            invoice.status = InvoiceStatus::Paid;
            invoices.update(invoice).await?;

            processed.push(serde_json::json!({
                "id": payment.id,
                "invoice_id": payment.invoice_id,
                "amount_cents": payment.amount_cents,
            }));
            result.success_count += 1;
        }

        uow.save_changes().await?;
        debug!(batch = batch.len(), "processed payment batch");
    }

    uow.commit_transaction().await?;
    Ok(serde_json::Value::Array(processed))
}

/// Queue a bulk payment run on `engine`.
pub fn submit_payment_run(
    engine: &JobEngine,
    invoice_ids: Vec<InvoiceId>,
    payment_method: String,
) -> JobId {
    let name = format!(
        "BulkProcessPayments-{}-{}",
        invoice_ids.len(),
        Utc::now().format("%Y%m%d-%H%M%S")
    );
    engine.submit(name, move |ctx| async move {
        let result = process_payments(&ctx, &invoice_ids, &payment_method).await?;
        Ok(serde_json::to_value(result)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonStore;
    use chrono::Duration;
    use medflow_billing::Invoice;
    use medflow_core::{AppointmentId, PatientId};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn test_ctx(store: Arc<JsonStore>) -> JobContext {
        JobContext {
            job_id: JobId::new(),
            store,
            cancellation: CancellationToken::new(),
        }
    }

    fn seeded(store: &Arc<JsonStore>, status: InvoiceStatus) -> InvoiceId {
        let mut invoice = Invoice::new(
            AppointmentId::new(),
            PatientId::new(),
            15_000,
            Utc::now() + Duration::days(30),
        );
        invoice.tax_cents = 500;
        invoice.status = status;
        let id = invoice.id;
        store.write(|d| d.invoices.push(invoice));
        id
    }

    #[tokio::test]
    async fn pending_invoice_is_settled_for_its_total() {
        let store = JsonStore::in_memory_arc();
        let id = seeded(&store, InvoiceStatus::Pending);
        let ctx = test_ctx(store.clone());

        let result = process_payments(&ctx, &[id], DEFAULT_PAYMENT_METHOD)
            .await
            .unwrap();

        assert!(result.is_success);
        assert_eq!(result.success_count, 1);

        let (invoice, payment) =
            store.read(|d| (d.invoices[0].clone(), d.payments[0].clone()));
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(payment.invoice_id, id);
        assert_eq!(payment.amount_cents, 15_500); // amount + tax
        assert_eq!(payment.method, "BulkPayment");
    }

    #[tokio::test]
    async fn already_paid_invoice_is_a_soft_failure() {
        let store = JsonStore::in_memory_arc();
        let id = seeded(&store, InvoiceStatus::Paid);
        let ctx = test_ctx(store.clone());

        let result = process_payments(&ctx, &[id], DEFAULT_PAYMENT_METHOD)
            .await
            .unwrap();

        assert!(result.is_success);
        assert_eq!(result.success_count, 0);
        assert_eq!(
            result.errors,
            vec![format!("Invoice {id} is not in pending status")]
        );
        assert!(store.read(|d| d.payments.is_empty()));
    }

    #[tokio::test]
    async fn existing_payment_blocks_a_second_one() {
        let store = JsonStore::in_memory_arc();
        let id = seeded(&store, InvoiceStatus::Pending);
        store.write(|d| d.payments.push(Payment::new(id, 15_500, "Cash")));
        let ctx = test_ctx(store.clone());

        let result = process_payments(&ctx, &[id], DEFAULT_PAYMENT_METHOD)
            .await
            .unwrap();

        assert_eq!(result.success_count, 0);
        assert_eq!(
            result.errors,
            vec![format!("Payment already exists for invoice {id}")]
        );
        assert_eq!(store.read(|d| d.payments.len()), 1);
        // The blocked run must not flip the invoice status either.
        assert_eq!(
            store.read(|d| d.invoices[0].status),
            InvoiceStatus::Pending
        );
    }

    #[tokio::test]
    async fn unknown_invoice_is_a_soft_failure() {
        let store = JsonStore::in_memory_arc();
        let missing = InvoiceId::new();
        let ctx = test_ctx(store.clone());

        let result = process_payments(&ctx, &[missing], DEFAULT_PAYMENT_METHOD)
            .await
            .unwrap();

        assert!(result.is_success);
        assert_eq!(result.errors, vec![format!("Invoice {missing} not found")]);
    }
}
