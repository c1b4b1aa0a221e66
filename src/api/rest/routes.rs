use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::rest::handlers::{callbacks, messaging, voice};
use crate::api::rest::logging_middleware::request_logging_middleware;
use crate::api::rest::middleware::auth_capture_middleware;
use crate::api::rest::state::RestState;

pub fn create_router(state: RestState) -> Router {
    Router::new()
        .route("/version", get(version))
        // Messaging
        .route("/send-sms-to-user", get(messaging::send_sms))
        .route(
            "/send-message-to-bulk-numbers",
            post(messaging::send_bulk_sms),
        )
        .route(
            "/send-dynamic-bulk-sms",
            post(messaging::send_dynamic_bulk_sms),
        )
        // Voice
        .route("/send-voice-call-to-user", get(voice::send_voice_call))
        .route("/outgoing-call-to-connect-number", get(voice::connect_call))
        .route("/connect-number-to-call-flow", get(voice::connect_call_flow))
        .route("/get-bulk-call-details", get(voice::bulk_call_details))
        .route("/get-number-metadata", get(voice::number_metadata))
        // Callback records and vendor status webhooks
        .route("/get-sms-callbacks", get(callbacks::get_sms_callbacks))
        .route(
            "/get-voice-call-callbacks",
            get(callbacks::get_voice_callbacks),
        )
        .route(
            "/sms-status-callback/{callback_id}/{token_digest}",
            post(callbacks::sms_status_callback),
        )
        .route(
            "/call-status/{callback_id}/{token_digest}",
            post(callbacks::call_status_callback),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_capture_middleware,
        ))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn version() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "api": "v0"
    }))
}
