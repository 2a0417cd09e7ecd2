//! Typed repositories over the shared document store.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use medflow_billing::{Invoice, Payment};
use medflow_core::Persisted;
use medflow_parties::{Doctor, Patient};
use medflow_scheduling::Appointment;

use super::database::{Collections, JsonStore, StoreError};

/// Maps a persisted entity type to its collection slot inside [`Collections`].
pub trait Document: Persisted {
    fn collection(data: &Collections) -> &Vec<Self>;
    fn collection_mut(data: &mut Collections) -> &mut Vec<Self>;
}

macro_rules! impl_document {
    ($t:ty, $field:ident) => {
        impl Document for $t {
            fn collection(data: &Collections) -> &Vec<Self> {
                &data.$field
            }

            fn collection_mut(data: &mut Collections) -> &mut Vec<Self> {
                &mut data.$field
            }
        }
    };
}

impl_document!(Patient, patients);
impl_document!(Doctor, doctors);
impl_document!(Appointment, appointments);
impl_document!(Invoice, invoices);
impl_document!(Payment, payments);

/// Typed CRUD + predicate search over one collection of the shared store.
///
/// `add`/`update`/`delete` persist immediately; with an open unit-of-work
/// transaction those writes remain revocable through its snapshot.
pub struct Repository<T: Document> {
    store: Arc<JsonStore>,
    _marker: PhantomData<T>,
}

impl<T: Document> Repository<T> {
    pub(crate) fn new(store: Arc<JsonStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn get_by_id(&self, id: T::Id) -> Option<T> {
        self.store
            .read(|data| T::collection(data).iter().find(|e| e.id() == id).cloned())
    }

    pub fn get_all(&self) -> Vec<T> {
        self.store.read(|data| T::collection(data).clone())
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.store.read(|data| {
            T::collection(data)
                .iter()
                .filter(|e| predicate(e))
                .cloned()
                .collect()
        })
    }

    pub fn first_or_default(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.store
            .read(|data| T::collection(data).iter().find(|e| predicate(e)).cloned())
    }

    /// Insert `entity`, assigning a fresh id when it carries the nil id and
    /// stamping both timestamps. Returns the stored entity.
    pub async fn add(&self, mut entity: T) -> Result<T, StoreError> {
        if Into::<Uuid>::into(entity.id()).is_nil() {
            entity.set_id(T::Id::from(Uuid::now_v7()));
        }
        let now = Utc::now();
        entity.set_created_at(now);
        entity.set_updated_at(now);

        self.store
            .write(|data| T::collection_mut(data).push(entity.clone()));
        self.store.persist().await?;
        Ok(entity)
    }

    /// Replace the stored entity with the same id, stamping `updated_at`.
    pub async fn update(&self, mut entity: T) -> Result<T, StoreError> {
        entity.set_updated_at(Utc::now());

        let found = self.store.write(|data| {
            let slot = T::collection_mut(data);
            match slot.iter_mut().find(|e| e.id() == entity.id()) {
                Some(existing) => {
                    *existing = entity.clone();
                    true
                }
                None => false,
            }
        });
        if !found {
            return Err(StoreError::NotFound(entity.id().into()));
        }

        self.store.persist().await?;
        Ok(entity)
    }

    /// Remove the entity with `id`; returns whether anything was removed.
    pub async fn delete(&self, id: T::Id) -> Result<bool, StoreError> {
        let removed = self.store.write(|data| {
            let slot = T::collection_mut(data);
            let before = slot.len();
            slot.retain(|e| e.id() != id);
            slot.len() != before
        });

        if removed {
            self.store.persist().await?;
        }
        Ok(removed)
    }
}
