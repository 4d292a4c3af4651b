use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::{AppError, AppResult};
use crate::utils::geo::{distance_km, Coordinates};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date: DateTime<Utc>,
    pub max_participants: i32,
    pub current_participants: i32,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }
}

/// Body of a create request. Every field is optional on the wire so that
/// missing values surface as validation errors rather than parse failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date: Option<String>,
    pub max_participants: Option<i32>,
    pub category: Option<String>,
}

/// Partial update. Empty strings and a zero `maxParticipants` mean
/// "leave unchanged"; `category` is applied whenever the key is present,
/// and `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date: Option<String>,
    pub max_participants: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub category: Option<Option<String>>,
}

/// Distinguishes an explicit `null` from an absent key.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// An event as listed to a caller, optionally annotated with its distance
/// from the caller's position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl EventView {
    pub fn from_origin(event: Event, origin: Option<Coordinates>) -> Self {
        let distance_km = distance_km(origin, event.coordinates());
        Self { event, distance_km }
    }
}

/// Current time at the microsecond precision PostgreSQL `TIMESTAMPTZ` keeps,
/// so every store returns the timestamps a mutation handed out.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Returns the value when it is present and non-empty.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Accepts RFC 3339 timestamps and the `datetime-local` form produced by
/// browsers (`2025-06-01T18:30`), the latter read as UTC.
pub fn parse_event_date(raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::ValidationError(format!("Invalid date '{}'", raw)))
}
