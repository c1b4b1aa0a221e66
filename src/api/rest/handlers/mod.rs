pub mod callbacks;
pub mod messaging;
pub mod voice;

use axum::http::{header::CONTENT_TYPE, HeaderValue};
use axum::response::{IntoResponse, Response};

/// Vendor responses are JSON text already; pass them through with the
/// right content type instead of re-encoding.
pub fn json_body(body: String) -> Response {
    (
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}
