//! Entity gateway: generic HTTP CRUD and schema introspection over registered entity types.

pub mod auth;
pub mod case;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod query;
pub mod registry;
pub mod routes;
pub mod schema;
pub mod serializer;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;
pub mod value;

pub use auth::{AuthPolicy, Operation, Principal};
pub use config::{introspect_pool, load_from_path, parse_catalog, resolve, CatalogConfig};
pub use descriptor::{FieldDescriptor, FieldType, TypeDescriptor};
pub use error::{AppError, ConfigError};
pub use registry::EntityRegistry;
pub use routes::{common_routes, gateway_routes};
pub use service::CrudService;
pub use settings::Settings;
pub use state::AppState;
pub use store::{EntityStore, MemoryStore, PgStore, Record, StorageError};
pub use value::FieldValue;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

/// Full application router: common routes plus the gateway, with a request body limit.
pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(gateway_routes(state))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(body_limit)))
}
