//! Snapshot-transactional document store.
//!
//! ## Design
//!
//! - `JsonStore`: live entity collections with optional JSON file persistence
//! - `Repository<T>`: typed CRUD + predicate search over one collection
//! - `UnitOfWork`: full-state snapshot with begin/commit/rollback, plus
//!   intermediate flushes between batches
//!
//! Mutations are visible to concurrent readers immediately; the snapshot buys
//! atomic recovery on rollback, not isolation from other writers.

mod database;
mod repository;
mod unit_of_work;

pub use database::{Collections, JsonStore, StoreError};
pub use repository::{Document, Repository};
pub use unit_of_work::UnitOfWork;
