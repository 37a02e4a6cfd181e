use std::sync::Arc;

use sluice_api::config::Config;
use sluice_api::event::{BroadcastPublisher, spawn_event_logger};
use sluice_api::repository::{MemoryStore, PgStore, Store};
use sluice_api::state::AppState;
use sluice_api::{api, db};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sluice_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sluice API...");

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(database_url, config.db_max_connections).await?;
            tracing::info!("Database connection pool created");

            db::run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, using the in-memory store");
            let store = MemoryStore::new();
            if let Some(token) = &config.dev_token {
                let project = store.seed_development(token)?;
                tracing::info!("Seeded development project {}", project.key);
            }
            Arc::new(store)
        }
    };

    let events = BroadcastPublisher::new(config.event_buffer);
    let _event_logger = spawn_event_logger(events.subscribe());

    let addr = config.bind_addr.clone();
    let state = AppState::new(store, Arc::new(events), config);

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
