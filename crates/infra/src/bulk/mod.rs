//! Batched, partially-failable bulk operations over the document store.
//!
//! Every body follows the same shape: open a transaction, walk the target ids
//! in fixed-size batches, record per-item business-rule rejections as soft
//! errors, flush after each batch, commit at the end. Any infrastructure
//! error is a hard failure: the whole run rolls back to its pre-transaction
//! snapshot and the result carries the error message.
//!
//! Cancellation is checked at the start of each batch and propagates as
//! [`JobError::Cancelled`](crate::jobs::JobError::Cancelled) without rolling
//! back — a cancelled body that wants its staged work gone must roll back
//! itself before returning.

pub mod appointments;
pub mod cleanup;
pub mod invoices;
pub mod payments;

pub use appointments::{submit_status_update, update_appointment_status};
pub use cleanup::{cleanup_stale_records, submit_cleanup};
pub use invoices::{DEFAULT_INVOICE_AMOUNT_CENTS, generate_invoices, submit_invoice_generation};
pub use payments::{DEFAULT_PAYMENT_METHOD, process_payments, submit_payment_run};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::JobContext;
use crate::store::StoreError;

/// Items handled per transaction flush.
pub(crate) const BATCH_SIZE: usize = 100;

/// Outcome of one bulk operation run. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkOperationResult {
    pub operation_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_success: bool,
    /// Number of target ids the run looked at.
    pub processed_count: usize,
    /// Number of items that passed their business rule and were staged.
    pub success_count: usize,
    /// Per-item business-rule rejections, in encounter order.
    pub errors: Vec<String>,
    /// Hard-failure message, set only when `is_success` is false.
    pub error_message: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl BulkOperationResult {
    pub(crate) fn started(operation_type: &str) -> Self {
        Self {
            operation_type: operation_type.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            is_success: false,
            processed_count: 0,
            success_count: 0,
            errors: Vec::new(),
            error_message: None,
            data: None,
        }
    }

    pub(crate) fn succeeded(mut self, processed_count: usize, data: Option<serde_json::Value>) -> Self {
        self.processed_count = processed_count;
        self.completed_at = Some(Utc::now());
        self.is_success = true;
        self.data = data;
        self
    }

    pub(crate) fn failed(mut self, message: String) -> Self {
        self.completed_at = Some(Utc::now());
        self.is_success = false;
        self.error_message = Some(message);
        self
    }

    /// Items that did not pass their business rule.
    pub fn failed_count(&self) -> usize {
        self.processed_count.saturating_sub(self.success_count)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.completed_at.map(|completed| completed - self.started_at)
    }
}

/// Why a bulk body stopped early.
pub(crate) enum BulkAbort {
    /// Cancellation observed at a batch boundary.
    Cancelled,
    /// Infrastructure failure; the caller rolls back.
    Infra(StoreError),
}

impl From<StoreError> for BulkAbort {
    fn from(err: StoreError) -> Self {
        Self::Infra(err)
    }
}

pub(crate) fn ensure_not_cancelled(ctx: &JobContext) -> Result<(), BulkAbort> {
    if ctx.cancellation.is_cancelled() {
        Err(BulkAbort::Cancelled)
    } else {
        Ok(())
    }
}
