//! Gateway server: settings from env (and `.env`), catalog from a JSON file or
//! PostgreSQL introspection, storage in PostgreSQL or in memory.

use entity_gateway::{
    config::{introspect_pool, load_from_path, resolve, CatalogConfig},
    router, AppState, AuthPolicy, CrudService, EntityStore, MemoryStore, PgStore, Settings,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("entity_gateway=info".parse()?))
        .init();

    let settings = Settings::from_env()?;

    let pool = match &settings.database_url {
        Some(url) => Some(
            PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(url)
                .await?,
        ),
        None => None,
    };

    let catalog = match (&settings.catalog_path, &pool) {
        (Some(path), _) => load_from_path(path).await?,
        (None, Some(pool)) if !settings.namespaces.is_empty() => {
            introspect_pool(pool, &settings.namespaces).await?
        }
        _ => {
            tracing::warn!("no GATEWAY_CATALOG and nothing to introspect; starting with an empty registry");
            CatalogConfig::default()
        }
    };
    let registry = Arc::new(resolve(&catalog)?);

    let store: Arc<dyn EntityStore> = match pool {
        Some(pool) => {
            tracing::info!(max_connections = settings.max_connections, "using postgres store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let auth = AuthPolicy::from_settings(&settings)?;
    let state = AppState::new(CrudService::new(registry, store), auth);
    let app = router(state, settings.body_limit).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(settings.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
