use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::event::Event;
use crate::utils::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryEventStore;
pub use postgres::PgEventStore;

/// Persistence for events. Implementations only store and fetch records;
/// invariants are enforced by `EventService`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events in insertion order.
    async fn list(&self) -> AppResult<Vec<Event>>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Event>>;

    /// Inserts a new event or replaces the record with the same id. An
    /// existing record keeps its stored participant count.
    async fn put(&self, event: Event) -> AppResult<()>;

    /// Adds one participant iff the event is below capacity, in a single
    /// atomic step. `None` when the event is missing or already full.
    async fn increment_participants(
        &self,
        id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<Event>>;

    /// Returns `false` when no record had that id.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}
