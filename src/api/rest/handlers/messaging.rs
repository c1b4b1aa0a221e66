use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::api::rest::error::ApiResult;
use crate::api::rest::handlers::json_body;
use crate::api::rest::state::{session_context, RestState};
use crate::shared::exotel::BulkMessage;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsParams {
    pub to_number: String,
    pub message: String,
    pub dlt_template_id: String,
    pub dlt_entity_id: String,
}

pub async fn send_sms(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(params): Query<SendSmsParams>,
) -> ApiResult<Response> {
    info!("Sending SMS to: {}", params.to_number);
    let ctx = session_context(&headers);
    let response = state
        .exotel
        .send_sms(
            &ctx,
            &params.to_number,
            &params.message,
            &params.dlt_template_id,
            &params.dlt_entity_id,
        )
        .await?;
    Ok(json_body(response))
}

/// Body of POST /send-message-to-bulk-numbers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSmsRequest {
    pub to_number: Vec<String>,
    pub message: String,
}

pub async fn send_bulk_sms(
    State(state): State<RestState>,
    headers: HeaderMap,
    Json(payload): Json<BulkSmsRequest>,
) -> ApiResult<Response> {
    info!("Sending bulk SMS to: {:?}", payload.to_number);
    let ctx = session_context(&headers);
    let response = state
        .exotel
        .send_bulk_sms(&ctx, &payload.to_number, &payload.message)
        .await?;
    Ok(json_body(response))
}

/// Body of POST /send-dynamic-bulk-sms.
#[derive(Debug, Deserialize)]
pub struct BulkDynamicSmsRequest {
    pub message: Vec<BulkMessage>,
}

pub async fn send_dynamic_bulk_sms(
    State(state): State<RestState>,
    headers: HeaderMap,
    Json(payload): Json<BulkDynamicSmsRequest>,
) -> ApiResult<Response> {
    info!("Sending dynamic bulk SMS with {} messages", payload.message.len());
    let ctx = session_context(&headers);
    let response = state
        .exotel
        .send_dynamic_bulk_sms(&ctx, &payload.message)
        .await?;
    Ok(json_body(response))
}
