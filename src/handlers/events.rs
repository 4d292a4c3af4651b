use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::event::{EventChanges, EventView, NewEvent};
use crate::routes::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::filter::EventFilter;
use crate::utils::geo::Coordinates;
use crate::utils::response::{created, no_content, ok};

#[derive(Debug, Default, Deserialize)]
pub struct ListEventsParams {
    pub location: Option<String>,
    pub q: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Ids that do not parse can never name a stored event.
fn parse_event_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::event_not_found())
}

pub async fn list_events(
    State(state): State<AppState>,
    params: Result<Query<ListEventsParams>, QueryRejection>,
) -> AppResult<Response> {
    let Query(params) = params?;

    let origin = Coordinates::from_pair(params.lat, params.lng)?;
    let filter = EventFilter::new(
        params.q.as_deref().unwrap_or_default(),
        params.location.as_deref().unwrap_or_default(),
    );

    let views: Vec<EventView> = state
        .events
        .search(&filter)
        .await?
        .into_iter()
        .map(|event| EventView::from_origin(event, origin))
        .collect();

    Ok(ok(views))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let event = state.events.get(parse_event_id(&id)?).await?;
    Ok(ok(event))
}

pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> AppResult<Response> {
    let Json(input) = payload?;
    let event = state.events.create(input).await?;
    Ok(created(event))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EventChanges>, JsonRejection>,
) -> AppResult<Response> {
    let id = parse_event_id(&id)?;
    let Json(changes) = payload?;
    let event = state.events.update(id, changes).await?;
    Ok(ok(event))
}

pub async fn join_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let event = state.events.join(parse_event_id(&id)?).await?;
    Ok(ok(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    state.events.delete(parse_event_id(&id)?).await?;
    Ok(no_content())
}
