use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{debug, info};

use crate::api::rest::state::RestState;
use crate::shared::auth::{mask_header, SessionContext, GLOBAL_SESSION_KEY};

/// Capture any inbound `Authorization` header into the session store so
/// that later invocations arriving without one (e.g. through the MCP
/// service) can still resolve a credential.
pub async fn auth_capture_middleware(
    State(state): State<RestState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    {
        Some(auth_header) => {
            info!(
                "Capturing Authorization header for {}: {}",
                path,
                mask_header(auth_header)
            );
            let ctx = SessionContext::detached(None);
            state.exotel.sessions.record(&ctx.session_key, auth_header);
            state.exotel.sessions.record(GLOBAL_SESSION_KEY, auth_header);
        }
        None => {
            debug!("No Authorization header found in request to: {}", path);
        }
    }

    next.run(request).await
}
