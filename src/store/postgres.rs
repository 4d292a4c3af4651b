use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::event::Event;
use crate::store::EventStore;
use crate::utils::error::AppResult;

const EVENT_COLUMNS: &str = "id, title, description, location, latitude, longitude, date, \
     max_participants, current_participants, category, created_at, updated_at";

/// PostgreSQL-backed store. Insertion order is kept by the `seq` column.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn list(&self) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events ORDER BY seq ASC",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn put(&self, event: Event) -> AppResult<()> {
        sqlx::query(
            r#"
                INSERT INTO events (
                    id, title, description, location, latitude, longitude, date,
                    max_participants, current_participants, category, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (id) DO UPDATE SET
                    title = EXCLUDED.title,
                    description = EXCLUDED.description,
                    location = EXCLUDED.location,
                    latitude = EXCLUDED.latitude,
                    longitude = EXCLUDED.longitude,
                    date = EXCLUDED.date,
                    max_participants = EXCLUDED.max_participants,
                    category = EXCLUDED.category,
                    updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.date)
        .bind(event.max_participants)
        .bind(event.current_participants)
        .bind(&event.category)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn increment_participants(
        &self,
        id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
                UPDATE events
                SET current_participants = current_participants + 1, updated_at = $2
                WHERE id = $1 AND current_participants < max_participants
                RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
