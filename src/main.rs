use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use events_server::config::Config;
use events_server::routes::{create_routes, AppState};
use events_server::store::{EventStore, InMemoryEventStore, PgEventStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("events_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    let store: Arc<dyn EventStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Successfully connected to database");

            sqlx::migrate!()
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Migrations run successfully");
            Arc::new(PgEventStore::new(pool))
        }
        None => {
            tracing::info!("DATABASE_URL not set, keeping events in memory");
            Arc::new(InMemoryEventStore::new())
        }
    };

    let app = create_routes(AppState::new(store), &config);

    let addr = config.socket_addr().expect("Invalid HOST/PORT");
    tracing::info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
