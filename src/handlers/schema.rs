//! Schema handlers: entity listing per namespace and field descriptions.

use crate::auth::Operation;
use crate::error::AppError;
use crate::extractors::Caller;
use crate::schema::{EntitySummary, FieldSchema};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

pub async fn list_entities(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(namespace): Path<String>,
) -> Result<Json<Vec<EntitySummary>>, AppError> {
    state.auth.authorize(&principal, Operation::ListEntities, &namespace)?;
    Ok(Json(state.service.list_entities(&namespace)?))
}

pub async fn describe(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(qualified_name): Path<String>,
) -> Result<Json<Vec<FieldSchema>>, AppError> {
    state.auth.authorize(&principal, Operation::Describe, &qualified_name)?;
    Ok(Json(state.service.describe(&qualified_name)?))
}
