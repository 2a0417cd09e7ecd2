//! Shared document store backing every entity collection.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use medflow_billing::{Invoice, Payment};
use medflow_parties::{Doctor, Patient};
use medflow_scheduling::Appointment;

/// Store-level error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `begin_transaction` was called while a transaction is already open.
    #[error("a transaction is already open")]
    TransactionOpen,

    #[error("entity not found: {0}")]
    NotFound(Uuid),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Every entity collection the store manages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collections {
    pub patients: Vec<Patient>,
    pub doctors: Vec<Doctor>,
    pub appointments: Vec<Appointment>,
    pub invoices: Vec<Invoice>,
    pub payments: Vec<Payment>,
}

/// Process-wide document store.
///
/// Construct one instance at startup and share it by `Arc`. The live
/// collections sit behind a read/write lock; durable writes go through a
/// single async writer lock so concurrent commits cannot interleave output.
#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    data: RwLock<Collections>,
    writer: Mutex<()>,
}

impl JsonStore {
    /// Open a store backed by a JSON file, creating the file when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            let empty = Collections::default();
            std::fs::write(&path, serde_json::to_string_pretty(&empty)?)?;
            empty
        };
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
            writer: Mutex::new(()),
        })
    }

    /// Purely in-memory store for tests and ephemeral use.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(Collections::default()),
            writer: Mutex::new(()),
        }
    }

    pub fn in_memory_arc() -> Arc<Self> {
        Arc::new(Self::in_memory())
    }

    /// Run `f` with shared read access to the live collections.
    pub fn read<R>(&self, f: impl FnOnce(&Collections) -> R) -> R {
        f(&self.data.read().unwrap())
    }

    /// Run `f` with exclusive write access to the live collections.
    pub fn write<R>(&self, f: impl FnOnce(&mut Collections) -> R) -> R {
        f(&mut self.data.write().unwrap())
    }

    /// Deep copy of the current collections.
    pub fn snapshot(&self) -> Collections {
        self.data.read().unwrap().clone()
    }

    /// Replace the contents of every live collection with `snapshot`.
    pub fn restore(&self, snapshot: Collections) {
        *self.data.write().unwrap() = snapshot;
    }

    /// Persist the current collections to the backing file.
    ///
    /// Serializes a point-in-time copy, then writes it while holding the
    /// writer lock; an in-memory store treats this as a no-op.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = {
            let data = self.data.read().unwrap();
            serde_json::to_string_pretty(&*data)?
        };
        let _guard = self.writer.lock().await;
        tokio::fs::write(path, json).await?;
        debug!(path = %path.display(), "store persisted");
        Ok(())
    }
}
