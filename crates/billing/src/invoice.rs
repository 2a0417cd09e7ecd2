use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medflow_core::{AppointmentId, InvoiceId, PatientId, Persisted};

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

/// Line item on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    /// Amount in smallest currency unit (e.g., cents).
    pub amount_cents: u64,
}

/// An invoice raised for a completed appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub appointment_id: AppointmentId,
    pub patient_id: PatientId,
    /// Base amount in smallest currency unit (e.g., cents).
    pub amount_cents: u64,
    pub tax_cents: u64,
    pub status: InvoiceStatus,
    pub lines: Vec<InvoiceLine>,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(
        appointment_id: AppointmentId,
        patient_id: PatientId,
        amount_cents: u64,
        due_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::new(),
            appointment_id,
            patient_id,
            amount_cents,
            tax_cents: 0,
            status: InvoiceStatus::Pending,
            lines: Vec::new(),
            due_date,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_cents(&self) -> u64 {
        self.amount_cents.saturating_add(self.tax_cents)
    }

    /// A pending invoice past its due date is overdue.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == InvoiceStatus::Pending && self.due_date < now
    }
}

impl Persisted for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> InvoiceId {
        self.id
    }

    fn set_id(&mut self, id: InvoiceId) {
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
