use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::events::{
    create_event, delete_event, get_event, join_event, list_events, update_event,
};
use crate::handlers::health_check;
use crate::services::EventService;
use crate::store::EventStore;

#[derive(Clone)]
pub struct AppState {
    pub events: Arc<EventService>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            events: Arc::new(EventService::new(store)),
        }
    }
}

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/events", get(list_events).post(create_event))
        .route(
            "/api/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/api/events/:id/join", put(join_event))
        .with_state(state)
        .layer(create_security_headers_layer(config))
        .layer(create_cors_layer(config))
        .layer(TraceLayer::new_for_http())
}
