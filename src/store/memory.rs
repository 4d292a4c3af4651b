use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::event::Event;
use crate::store::EventStore;
use crate::utils::error::AppResult;

/// Process-local store. Records are kept in a `Vec` so listing preserves
/// insertion order.
#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn list(&self) -> AppResult<Vec<Event>> {
        Ok(self.events.read().await.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Event>> {
        let events = self.events.read().await;
        Ok(events.iter().find(|e| e.id == id).cloned())
    }

    async fn put(&self, event: Event) -> AppResult<()> {
        let mut events = self.events.write().await;
        match events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => {
                let current_participants = existing.current_participants;
                *existing = Event {
                    current_participants,
                    created_at: existing.created_at,
                    ..event
                };
            }
            None => events.push(event),
        }
        Ok(())
    }

    async fn increment_participants(
        &self,
        id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<Event>> {
        let mut events = self.events.write().await;
        match events.iter_mut().find(|e| e.id == id) {
            Some(event) if !event.is_full() => {
                event.current_participants += 1;
                event.updated_at = updated_at;
                Ok(Some(event.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut events = self.events.write().await;
        match events.iter().position(|e| e.id == id) {
            Some(index) => {
                events.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
