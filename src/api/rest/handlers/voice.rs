use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use tracing::info;

use crate::api::rest::error::ApiResult;
use crate::api::rest::handlers::json_body;
use crate::api::rest::state::{session_context, RestState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCallParams {
    pub to_number: String,
}

pub async fn send_voice_call(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(params): Query<VoiceCallParams>,
) -> ApiResult<Response> {
    info!("Sending voice call to: {}", params.to_number);
    let ctx = session_context(&headers);
    let response = state.exotel.send_voice_call(&ctx, &params.to_number).await?;
    Ok(json_body(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectCallParams {
    pub from_number: String,
    pub to_number: String,
}

pub async fn connect_call(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(params): Query<ConnectCallParams>,
) -> ApiResult<Response> {
    info!(
        "Connecting call from: {} to: {}",
        params.from_number, params.to_number
    );
    let ctx = session_context(&headers);
    let response = state
        .exotel
        .connect_call(&ctx, &params.from_number, &params.to_number)
        .await?;
    Ok(json_body(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFlowParams {
    pub app_id: String,
    pub from_number: String,
}

pub async fn connect_call_flow(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(params): Query<CallFlowParams>,
) -> ApiResult<Response> {
    info!("Connecting to call flow: {}", params.app_id);
    let ctx = session_context(&headers);
    let response = state
        .exotel
        .connect_call_flow(&ctx, &params.app_id, &params.from_number)
        .await?;
    Ok(json_body(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCallDetailsParams {
    pub from_number: String,
}

pub async fn bulk_call_details(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(params): Query<BulkCallDetailsParams>,
) -> ApiResult<Response> {
    info!("Fetching bulk voice call details...");
    let ctx = session_context(&headers);
    let response = state
        .exotel
        .bulk_call_details(&ctx, &params.from_number)
        .await?;
    Ok(json_body(response))
}

#[derive(Debug, Deserialize)]
pub struct NumberMetadataParams {
    pub number: String,
}

pub async fn number_metadata(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(params): Query<NumberMetadataParams>,
) -> ApiResult<Response> {
    info!("Fetching number metadata...");
    let ctx = session_context(&headers);
    let response = state.exotel.number_metadata(&ctx, &params.number).await?;
    Ok(json_body(response))
}
