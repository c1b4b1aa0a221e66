use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::shared::auth::SessionContext;
use crate::shared::config::GatewayConfig;
use crate::shared::exotel::ExotelClient;
use crate::shared::models::AppState;

#[derive(Clone)]
pub struct RestState {
    pub exotel: Arc<ExotelClient>,
}

impl RestState {
    pub fn new(app: Arc<AppState>, config: GatewayConfig) -> Self {
        Self {
            exotel: Arc::new(ExotelClient::new(app, config)),
        }
    }
}

/// Build the caller's session context from the request headers. REST has no
/// transport session id, so the key is worker-derived; the header itself is
/// what travels with the operation.
pub fn session_context(headers: &HeaderMap) -> SessionContext {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|v| !v.trim().is_empty());
    SessionContext::detached(auth_header)
}
