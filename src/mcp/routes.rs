use axum::{routing::post, Router};
use tower_http::trace::TraceLayer;

use crate::mcp::handlers::handle_rpc;
use crate::mcp::state::McpState;

pub fn create_router(state: McpState) -> Router {
    Router::new()
        .route("/mcp", post(handle_rpc))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
