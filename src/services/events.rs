use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::event::{
    non_empty, parse_event_date, timestamp_now, Event, EventChanges, NewEvent,
};
use crate::store::EventStore;
use crate::utils::error::{AppError, AppResult};
use crate::utils::filter::EventFilter;
use crate::utils::geo::Coordinates;

/// Owns the event collection and enforces the participant invariant
/// `0 <= current_participants <= max_participants`.
///
/// Reads go straight to the store. Every mutation runs under `write_lock`,
/// so a read-check-write sequence such as joining an event cannot interleave
/// with another mutation.
pub struct EventService {
    store: Arc<dyn EventStore>,
    write_lock: Mutex<()>,
}

impl EventService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// All events, optionally narrowed to a location substring.
    pub async fn list(&self, location: Option<&str>) -> AppResult<Vec<Event>> {
        self.search(&EventFilter::by_location(location.unwrap_or_default()))
            .await
    }

    pub async fn search(&self, filter: &EventFilter) -> AppResult<Vec<Event>> {
        let events = self.store.list().await?;
        Ok(filter.apply(events))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Event> {
        self.store
            .get(id)
            .await?
            .ok_or_else(AppError::event_not_found)
    }

    pub async fn create(&self, input: NewEvent) -> AppResult<Event> {
        let (title, description, location, date, max_participants) = match (
            non_empty(input.title.as_deref()),
            non_empty(input.description.as_deref()),
            non_empty(input.location.as_deref()),
            non_empty(input.date.as_deref()),
            input.max_participants.filter(|m| *m != 0),
        ) {
            (Some(t), Some(d), Some(l), Some(date), Some(max)) => (t, d, l, date, max),
            _ => {
                return Err(AppError::ValidationError(
                    "All fields are required".to_string(),
                ))
            }
        };

        if max_participants < 1 {
            return Err(AppError::ValidationError(
                "maxParticipants must be at least 1".to_string(),
            ));
        }

        let date = parse_event_date(date)?;
        let coordinates = Coordinates::from_pair(input.latitude, input.longitude)?;

        let now = timestamp_now();
        let event = Event {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            location: location.to_string(),
            latitude: coordinates.map(|c| c.latitude),
            longitude: coordinates.map(|c| c.longitude),
            date,
            max_participants,
            current_participants: 0,
            category: input.category,
            created_at: now,
            updated_at: now,
        };

        let _guard = self.write_lock.lock().await;
        self.store.put(event.clone()).await?;

        info!(event_id = %event.id, max_participants, "Event created");
        Ok(event)
    }

    pub async fn update(&self, id: Uuid, changes: EventChanges) -> AppResult<Event> {
        let _guard = self.write_lock.lock().await;

        let mut event = self.get(id).await?;

        // Validate everything before touching the record.
        let max_participants = changes.max_participants.filter(|m| *m != 0);
        if let Some(max) = max_participants {
            if max < event.current_participants {
                return Err(AppError::ValidationError(
                    "maxParticipants cannot be less than current participants".to_string(),
                ));
            }
            if max < 1 {
                return Err(AppError::ValidationError(
                    "maxParticipants must be at least 1".to_string(),
                ));
            }
        }
        let date = non_empty(changes.date.as_deref())
            .map(parse_event_date)
            .transpose()?;
        let coordinates = Coordinates::from_pair(changes.latitude, changes.longitude)?;

        if let Some(title) = non_empty(changes.title.as_deref()) {
            event.title = title.to_string();
        }
        if let Some(description) = non_empty(changes.description.as_deref()) {
            event.description = description.to_string();
        }
        if let Some(location) = non_empty(changes.location.as_deref()) {
            event.location = location.to_string();
        }
        if let Some(date) = date {
            event.date = date;
        }
        if let Some(max) = max_participants {
            event.max_participants = max;
        }
        if let Some(point) = coordinates {
            event.latitude = Some(point.latitude);
            event.longitude = Some(point.longitude);
        }
        if let Some(category) = changes.category {
            event.category = category;
        }
        event.updated_at = timestamp_now();

        self.store.put(event.clone()).await?;

        info!(event_id = %id, "Event updated");
        Ok(event)
    }

    /// Claims one participant slot.
    pub async fn join(&self, id: Uuid) -> AppResult<Event> {
        let _guard = self.write_lock.lock().await;

        let event = self.get(id).await?;
        if event.is_full() {
            debug!(event_id = %id, max = event.max_participants, "Join rejected, event full");
            return Err(AppError::CapacityError("Event is full".to_string()));
        }

        // The store re-checks capacity, which covers writers outside this process.
        let event = match self
            .store
            .increment_participants(id, timestamp_now())
            .await?
        {
            Some(event) => event,
            None => {
                // NotFound when another process deleted it meanwhile.
                self.get(id).await?;
                debug!(event_id = %id, "Join rejected, filled concurrently");
                return Err(AppError::CapacityError("Event is full".to_string()));
            }
        };

        info!(
            event_id = %id,
            current = event.current_participants,
            max = event.max_participants,
            "Participant joined"
        );
        Ok(event)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        if !self.store.delete(id).await? {
            return Err(AppError::event_not_found());
        }

        info!(event_id = %id, "Event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryEventStore;
    use std::time::Duration;

    fn service() -> Arc<EventService> {
        Arc::new(EventService::new(Arc::new(InMemoryEventStore::new())))
    }

    fn new_event(title: &str, location: &str, max: i32) -> NewEvent {
        NewEvent {
            title: Some(title.to_string()),
            description: Some("A fun gathering".to_string()),
            location: Some(location.to_string()),
            date: Some("2030-01-01T18:00:00Z".to_string()),
            max_participants: Some(max),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_starts_with_zero_participants() {
        let svc = service();
        let event = svc.create(new_event("Meetup", "NYC", 7)).await.unwrap();

        assert_eq!(event.current_participants, 0);
        assert_eq!(event.max_participants, 7);
        assert_eq!(event.created_at, event.updated_at);
        assert_eq!(svc.get(event.id).await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let svc = service();

        let mut missing_title = new_event("Meetup", "NYC", 2);
        missing_title.title = None;
        let mut empty_location = new_event("Meetup", "NYC", 2);
        empty_location.location = Some(String::new());
        let mut zero_capacity = new_event("Meetup", "NYC", 2);
        zero_capacity.max_participants = Some(0);
        let mut no_date = new_event("Meetup", "NYC", 2);
        no_date.date = None;

        for input in [missing_title, empty_location, zero_capacity, no_date] {
            let err = svc.create(input).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(ref m) if m == "All fields are required"));
        }
        assert!(svc.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_negative_capacity() {
        let svc = service();
        let err = svc.create(new_event("Meetup", "NYC", -3)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_half_coordinates() {
        let svc = service();
        let mut input = new_event("Meetup", "NYC", 2);
        input.latitude = Some(40.7);
        let err = svc.create(input).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_join_until_full() {
        let svc = service();
        let event = svc.create(new_event("Meetup", "NYC", 2)).await.unwrap();

        assert_eq!(svc.join(event.id).await.unwrap().current_participants, 1);
        assert_eq!(svc.join(event.id).await.unwrap().current_participants, 2);

        let err = svc.join(event.id).await.unwrap_err();
        assert!(matches!(err, AppError::CapacityError(_)));
        assert_eq!(svc.get(event.id).await.unwrap().current_participants, 2);
    }

    #[tokio::test]
    async fn test_join_refreshes_updated_at() {
        let svc = service();
        let event = svc.create(new_event("Meetup", "NYC", 2)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        let joined = svc.join(event.id).await.unwrap();
        assert!(joined.updated_at > event.updated_at);
        assert_eq!(joined.created_at, event.created_at);
        assert_eq!(svc.get(event.id).await.unwrap().updated_at, joined.updated_at);
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let svc = service();
        let event = svc.create(new_event("Meetup", "NYC", 2)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        let updated = svc
            .update(
                event.id,
                EventChanges {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.updated_at > event.updated_at);
        assert_eq!(updated.created_at, event.created_at);
        assert_eq!(svc.get(event.id).await.unwrap().updated_at, updated.updated_at);
    }

    #[tokio::test]
    async fn test_timestamps_survive_store_round_trip() {
        let svc = service();
        let event = svc.create(new_event("Meetup", "NYC", 2)).await.unwrap();
        assert_eq!(event.created_at.timestamp_subsec_nanos() % 1_000, 0);

        let joined = svc.join(event.id).await.unwrap();
        assert_eq!(joined.updated_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[tokio::test]
    async fn test_join_sees_slots_taken_by_other_writers() {
        let store = Arc::new(InMemoryEventStore::new());
        let svc = EventService::new(store.clone());
        let event = svc.create(new_event("Meetup", "NYC", 1)).await.unwrap();

        // Another writer takes the last slot behind the service's back.
        assert!(store
            .increment_participants(event.id, timestamp_now())
            .await
            .unwrap()
            .is_some());
        assert!(store
            .increment_participants(event.id, timestamp_now())
            .await
            .unwrap()
            .is_none());

        let err = svc.join(event.id).await.unwrap_err();
        assert!(matches!(err, AppError::CapacityError(_)));
        assert_eq!(svc.get(event.id).await.unwrap().current_participants, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_never_exceed_capacity() {
        let svc = service();
        let event = svc.create(new_event("Popular", "NYC", 10)).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.join(event.id).await })
            })
            .collect();

        let mut joined = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => joined += 1,
                Err(AppError::CapacityError(_)) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(joined, 10);
        assert_eq!(rejected, 40);
        assert_eq!(svc.get(event.id).await.unwrap().current_participants, 10);
    }

    #[tokio::test]
    async fn test_update_ignores_empty_values() {
        let svc = service();
        let event = svc.create(new_event("Meetup", "NYC", 5)).await.unwrap();

        let updated = svc
            .update(
                event.id,
                EventChanges {
                    title: Some(String::new()),
                    description: Some("Updated description".to_string()),
                    max_participants: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Meetup");
        assert_eq!(updated.description, "Updated description");
        assert_eq!(updated.max_participants, 5);
    }

    #[tokio::test]
    async fn test_update_category_on_presence() {
        let svc = service();
        let mut input = new_event("Meetup", "NYC", 5);
        input.category = Some("tech".to_string());
        let event = svc.create(input).await.unwrap();

        let untouched = svc.update(event.id, EventChanges::default()).await.unwrap();
        assert_eq!(untouched.category.as_deref(), Some("tech"));

        let blank = svc
            .update(
                event.id,
                EventChanges {
                    category: Some(Some(String::new())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(blank.category.as_deref(), Some(""));

        let cleared = svc
            .update(
                event.id,
                EventChanges {
                    category: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.category, None);
    }

    #[tokio::test]
    async fn test_update_cannot_shrink_below_participants() {
        let svc = service();
        let event = svc.create(new_event("Meetup", "NYC", 3)).await.unwrap();
        svc.join(event.id).await.unwrap();
        svc.join(event.id).await.unwrap();

        let err = svc
            .update(
                event.id,
                EventChanges {
                    title: Some("Renamed".to_string()),
                    max_participants: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        // Nothing from the rejected request was applied.
        let stored = svc.get(event.id).await.unwrap();
        assert_eq!(stored.title, "Meetup");
        assert_eq!(stored.max_participants, 3);

        let shrunk = svc
            .update(
                event.id,
                EventChanges {
                    max_participants: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(shrunk.max_participants, 2);
        assert!(shrunk.is_full());
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_date_without_writing() {
        let svc = service();
        let event = svc.create(new_event("Meetup", "NYC", 3)).await.unwrap();

        let err = svc
            .update(
                event.id,
                EventChanges {
                    title: Some("Renamed".to_string()),
                    date: Some("not a date".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(svc.get(event.id).await.unwrap().title, "Meetup");
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let svc = service();
        let id = Uuid::new_v4();

        assert!(matches!(svc.get(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.join(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.delete(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            svc.update(id, EventChanges::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_permanent() {
        let svc = service();
        let event = svc.create(new_event("Meetup", "NYC", 3)).await.unwrap();

        svc.delete(event.id).await.unwrap();

        assert!(matches!(svc.get(event.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.join(event.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.delete(event.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_location_in_insertion_order() {
        let svc = service();
        let a = svc.create(new_event("A", "New York", 3)).await.unwrap();
        let b = svc.create(new_event("B", "Boston", 3)).await.unwrap();
        let c = svc.create(new_event("C", "NYC Midtown", 3)).await.unwrap();

        let all: Vec<_> = svc.list(None).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(all, vec![a.id, b.id, c.id]);

        let empty: Vec<_> = svc.list(Some("")).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(empty, all);

        let ny: Vec<_> = svc.list(Some("new")).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ny, vec![a.id]);
    }

    #[tokio::test]
    async fn test_search_by_title() {
        let svc = service();
        svc.create(new_event("Tech Meetup", "NYC", 3)).await.unwrap();
        svc.create(new_event("Art Show", "NYC", 3)).await.unwrap();

        let found = svc.search(&EventFilter::new("tech", "")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Tech Meetup");
    }
}
