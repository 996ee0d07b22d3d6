//! Query handlers: filtered listing and CRUD by id for any registered entity.

use crate::auth::Operation;
use crate::error::AppError;
use crate::extractors::{Caller, JsonBody, QueryPairs};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

pub async fn list(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(qualified_name): Path<String>,
    QueryPairs(params): QueryPairs,
) -> Result<Json<Vec<Value>>, AppError> {
    state.auth.authorize(&principal, Operation::List, &qualified_name)?;
    Ok(Json(state.service.list(&qualified_name, &params).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(qualified_name): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<Value>), AppError> {
    state.auth.authorize(&principal, Operation::Create, &qualified_name)?;
    let created = state.service.create(&qualified_name, &body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn read(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path((qualified_name, id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    state.auth.authorize(&principal, Operation::Read, &qualified_name)?;
    Ok(Json(state.service.read(&qualified_name, &id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path((qualified_name, id)): Path<(String, String)>,
    JsonBody(body): JsonBody,
) -> Result<Json<Value>, AppError> {
    state.auth.authorize(&principal, Operation::Update, &qualified_name)?;
    Ok(Json(state.service.update(&qualified_name, &id, &body).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path((qualified_name, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state.auth.authorize(&principal, Operation::Delete, &qualified_name)?;
    state.service.delete(&qualified_name, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
