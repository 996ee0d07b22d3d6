//! Gateway routes. Entities are addressed by qualified name in the path, so one
//! set of routes serves every registered type.

use crate::handlers::{query, schema};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn gateway_routes(state: AppState) -> Router {
    Router::new()
        .route("/schema/module/:namespace", get(schema::list_entities))
        .route("/schema/:qualified_name", get(schema::describe))
        .route("/query/:qualified_name", get(query::list).post(query::create))
        .route(
            "/query/:qualified_name/:id",
            get(query::read).put(query::update).delete(query::delete),
        )
        .with_state(state)
}
