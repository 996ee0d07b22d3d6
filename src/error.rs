//! Typed errors and HTTP mapping.

use crate::store::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Startup errors: catalog validation and settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid {kind} name: '{name}'")]
    InvalidIdentifier { kind: &'static str, name: String },
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),
    #[error("duplicate field: {entity}.{field}")]
    DuplicateField { entity: String, field: String },
    #[error("invalid primary key on {entity}: {reason}")]
    InvalidPrimaryKey { entity: String, reason: String },
    #[error("unknown field type '{type_name}' on {entity}.{field}")]
    UnknownFieldType {
        entity: String,
        field: String,
        type_name: String,
    },
    #[error("enumeration {entity}.{field} has no choices")]
    MissingChoices { entity: String, field: String },
    #[error("default for {entity}.{field} does not match its type")]
    InvalidDefault { entity: String, field: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),
    #[error("unknown filter field: {0}")]
    UnknownFilterField(String),
    #[error("filter {field}: '{value}' is not a valid {expected}")]
    FilterValueTypeMismatch {
        field: String,
        value: String,
        expected: &'static str,
    },
    #[error("field is read-only: {0}")]
    ReadOnlyField(String),
    #[error("missing required field: {0}")]
    MissingRequiredField(String),
    #[error("field {field}: {value} is not a valid {expected}")]
    FieldTypeMismatch {
        field: String,
        value: serde_json::Value,
        expected: &'static str,
    },
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("invalid id for {entity}: '{id}' is not a valid {expected}")]
    InvalidId {
        entity: String,
        id: String,
        expected: &'static str,
    },
    #[error("not found: {entity} {id}")]
    NotFound { entity: String, id: String },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("authentication required: {0}")]
    Unauthenticated(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("record inconsistent with {entity}: {reason}")]
    InconsistentRecord { entity: String, reason: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AppError {
    /// Stable status category and machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::EntityNotFound(_) => (StatusCode::NOT_FOUND, "entity_not_found"),
            AppError::NamespaceNotFound(_) => (StatusCode::NOT_FOUND, "namespace_not_found"),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            AppError::UnknownFilterField(_) => (StatusCode::BAD_REQUEST, "unknown_filter_field"),
            AppError::FilterValueTypeMismatch { .. } => {
                (StatusCode::BAD_REQUEST, "filter_value_type_mismatch")
            }
            AppError::ReadOnlyField(_) => (StatusCode::BAD_REQUEST, "read_only_field"),
            AppError::MissingRequiredField(_) => (StatusCode::BAD_REQUEST, "missing_required_field"),
            AppError::FieldTypeMismatch { .. } => (StatusCode::BAD_REQUEST, "field_type_mismatch"),
            AppError::UnknownField(_) => (StatusCode::BAD_REQUEST, "unknown_field"),
            AppError::InvalidId { .. } => (StatusCode::BAD_REQUEST, "invalid_id"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "permission_denied"),
            AppError::InconsistentRecord { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "inconsistent_record")
            }
            AppError::Storage(e) => match e {
                StorageError::Conflict(_) => (StatusCode::CONFLICT, "storage_conflict"),
                StorageError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable"),
                StorageError::Database(_) => (StatusCode::BAD_GATEWAY, "storage_error"),
            },
        }
    }

    /// Structured context a client can use to correct the request.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::UnknownFilterField(field)
            | AppError::ReadOnlyField(field)
            | AppError::MissingRequiredField(field)
            | AppError::UnknownField(field) => Some(json!({ "field": field })),
            AppError::FilterValueTypeMismatch {
                field,
                value,
                expected,
            } => Some(json!({ "field": field, "value": value, "expected": expected })),
            AppError::FieldTypeMismatch {
                field,
                value,
                expected,
            } => Some(json!({ "field": field, "value": value, "expected": expected })),
            AppError::InvalidId { id, expected, .. } => {
                Some(json!({ "value": id, "expected": expected }))
            }
            _ => None,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::debug!(error = %self, code, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}
