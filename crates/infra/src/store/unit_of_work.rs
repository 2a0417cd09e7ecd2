//! Snapshot-based unit of work over the shared store.

use std::sync::Arc;

use tracing::debug;

use medflow_billing::{Invoice, Payment};
use medflow_parties::{Doctor, Patient};
use medflow_scheduling::Appointment;

use super::database::{Collections, JsonStore, StoreError};
use super::repository::Repository;

/// Pseudo-transaction over the document store.
///
/// `begin_transaction` captures a deep copy of every collection. Mutations
/// made through the repositories hit the live collections immediately and are
/// visible to concurrent readers; the snapshot only enables atomic recovery.
/// `rollback_transaction` restores the snapshot wholesale, which also undoes
/// anything flushed in between with `save_changes`.
pub struct UnitOfWork {
    store: Arc<JsonStore>,
    snapshot: Option<Collections>,
}

impl UnitOfWork {
    pub fn new(store: Arc<JsonStore>) -> Self {
        Self {
            store,
            snapshot: None,
        }
    }

    pub fn patients(&self) -> Repository<Patient> {
        Repository::new(self.store.clone())
    }

    pub fn doctors(&self) -> Repository<Doctor> {
        Repository::new(self.store.clone())
    }

    pub fn appointments(&self) -> Repository<Appointment> {
        Repository::new(self.store.clone())
    }

    pub fn invoices(&self) -> Repository<Invoice> {
        Repository::new(self.store.clone())
    }

    pub fn payments(&self) -> Repository<Payment> {
        Repository::new(self.store.clone())
    }

    /// Whether a transaction is currently open.
    pub fn is_open(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Capture a snapshot of every collection and open the transaction.
    ///
    /// A unit of work holds at most one open transaction; calling this again
    /// before commit or rollback is a usage error.
    pub fn begin_transaction(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(StoreError::TransactionOpen);
        }
        self.snapshot = Some(self.store.snapshot());
        debug!("transaction opened");
        Ok(())
    }

    /// Persist the live collections and close the transaction.
    ///
    /// The open flag is cleared *before* the durable write: a failed write
    /// leaves the commit applied in memory but not saved, and the caller must
    /// treat that as fatal for the whole operation. A no-op when no
    /// transaction is open.
    pub async fn commit_transaction(&mut self) -> Result<(), StoreError> {
        if self.snapshot.take().is_none() {
            return Ok(());
        }
        self.store.persist().await?;
        debug!("transaction committed");
        Ok(())
    }

    /// Restore every collection from the snapshot, discarding every mutation
    /// made since `begin_transaction` — including state already flushed with
    /// `save_changes`. A no-op when no transaction is open.
    pub fn rollback_transaction(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.store.restore(snapshot);
            debug!("transaction rolled back");
        }
    }

    /// Intermediate flush: persist current live state without closing the
    /// transaction.
    pub async fn save_changes(&self) -> Result<(), StoreError> {
        self.store.persist().await
    }
}
