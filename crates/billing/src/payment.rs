use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medflow_core::{InvoiceId, PaymentId, Persisted};

/// Payment status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Processing,
    Completed,
    Failed,
    Refunded,
}

/// A payment settling an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    /// Amount in smallest currency unit (e.g., cents).
    pub amount_cents: u64,
    /// Free-form method label ("CreditCard", "Insurance", "BulkPayment", ...).
    pub method: String,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub processed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(invoice_id: InvoiceId, amount_cents: u64, method: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            invoice_id,
            amount_cents,
            method: method.into(),
            transaction_id: String::new(),
            status: PaymentStatus::Completed,
            processed_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Persisted for Payment {
    type Id = PaymentId;

    fn id(&self) -> PaymentId {
        self.id
    }

    fn set_id(&mut self, id: PaymentId) {
        self.id = id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}
