//! Billing domain module (invoices and payments).
//!
//! This crate contains the billing lifecycle records, implemented purely as
//! deterministic domain data (no IO, no HTTP, no storage).

pub mod invoice;
pub mod payment;

pub use invoice::{Invoice, InvoiceLine, InvoiceStatus};
pub use payment::{Payment, PaymentStatus};
