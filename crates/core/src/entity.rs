//! Persisted-entity capability: statically resolved id and timestamp access.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Capability every stored entity implements so generic infrastructure can
/// assign ids and stamp timestamps without runtime property lookup.
pub trait Persisted: Clone + Send + Sync + 'static {
    /// Strongly-typed entity identifier.
    type Id: Copy
        + Eq
        + core::hash::Hash
        + core::fmt::Display
        + core::fmt::Debug
        + From<Uuid>
        + Into<Uuid>
        + Send
        + Sync;

    fn id(&self) -> Self::Id;
    fn set_id(&mut self, id: Self::Id);

    fn created_at(&self) -> DateTime<Utc>;
    fn set_created_at(&mut self, at: DateTime<Utc>);

    fn updated_at(&self) -> DateTime<Utc>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);
}
