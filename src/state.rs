//! Shared application state for all routes.

use crate::auth::AuthPolicy;
use crate::service::CrudService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CrudService>,
    pub auth: Arc<AuthPolicy>,
}

impl AppState {
    pub fn new(service: CrudService, auth: AuthPolicy) -> Self {
        AppState {
            service: Arc::new(service),
            auth: Arc::new(auth),
        }
    }
}
