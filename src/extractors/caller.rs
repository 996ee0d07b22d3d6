//! Identify the caller from request headers using the configured authenticators.

use crate::auth::Principal;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// The authenticated principal, or anonymous.
#[derive(Clone, Debug)]
pub struct Caller(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Caller(state.auth.authenticate(&parts.headers)))
    }
}
