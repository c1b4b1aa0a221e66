use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::state::{session_context, RestState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackSearchParams {
    pub to_number: String,
}

pub async fn get_sms_callbacks(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(params): Query<CallbackSearchParams>,
) -> ApiResult<Json<Value>> {
    info!("Fetching SMS callbacks for: {}", params.to_number);
    let ctx = session_context(&headers);
    let result = state.exotel.sms_callbacks(&ctx, &params.to_number).await?;
    Ok(Json(result))
}

pub async fn get_voice_callbacks(
    State(state): State<RestState>,
    headers: HeaderMap,
    Query(params): Query<CallbackSearchParams>,
) -> ApiResult<Json<Value>> {
    info!("Fetching voice callbacks for: {}", params.to_number);
    let ctx = session_context(&headers);
    let result = state.exotel.voice_callbacks(&ctx, &params.to_number).await?;
    Ok(Json(result))
}

/// Status webhook for a previously sent SMS. The vendor posts either JSON
/// or a form body depending on configuration age.
pub async fn sms_status_callback(
    State(state): State<RestState>,
    Path((callback_id, token_digest)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    info!(
        "Received SMS callback for ID: {}, Token: {}",
        callback_id, token_digest
    );

    let data = parse_callback_body(content_type(&headers), &body)
        .ok_or_else(|| ApiError::BadRequest("No callback data provided".to_string()))?;

    state.exotel.save_sms_status(&data, &token_digest).await?;

    Ok(Json(json!({
        "message": "SMS callback received and processed successfully",
        "callback_id": callback_id,
        "sms_sid": data.get("SmsSid"),
        "status": data.get("Status"),
    })))
}

/// Status webhook for a voice call.
pub async fn call_status_callback(
    State(state): State<RestState>,
    Path((callback_id, token_digest)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    info!(
        "Received voice callback for ID: {}, Token: {}",
        callback_id, token_digest
    );

    let data = parse_callback_body(content_type(&headers), &body)
        .ok_or_else(|| ApiError::BadRequest("No callback data provided".to_string()))?;

    state.exotel.save_voice_status(&data, &token_digest).await?;

    Ok(Json(json!({
        "message": "Voice callback received and processed successfully",
        "callback_id": token_digest,
        "call_sid": data.get("CallSid"),
        "status": data.get("Status"),
    })))
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// Decode a webhook body as a flat string map. JSON object bodies are the
/// current vendor format; form-encoded bodies are the legacy one.
fn parse_callback_body(content_type: Option<&str>, body: &[u8]) -> Option<HashMap<String, String>> {
    if body.is_empty() {
        return None;
    }

    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or_else(|| body.first() == Some(&b'{'));

    let data: HashMap<String, String> = if is_json {
        let value: Value = serde_json::from_slice(body).ok()?;
        let object = value.as_object()?;
        object
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), text)
            })
            .collect()
    } else {
        url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    };

    if data.is_empty() {
        warn!("No callback data received");
        None
    } else {
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_bodies_parse_into_string_values() {
        let body = br#"{"SmsSid":"s1","Status":"sent","SmsUnits":1,"Skip":null}"#;
        let data = parse_callback_body(Some("application/json"), body).unwrap();
        assert_eq!(data.get("SmsSid").unwrap(), "s1");
        assert_eq!(data.get("Status").unwrap(), "sent");
        assert_eq!(data.get("SmsUnits").unwrap(), "1");
        assert!(!data.contains_key("Skip"));
    }

    #[test]
    fn form_bodies_parse_as_legacy_format() {
        let body = b"CallSid=c1&Status=completed&RecordingUrl=http%3A%2F%2Fr";
        let data =
            parse_callback_body(Some("application/x-www-form-urlencoded"), body).unwrap();
        assert_eq!(data.get("CallSid").unwrap(), "c1");
        assert_eq!(data.get("RecordingUrl").unwrap(), "http://r");
    }

    #[test]
    fn missing_content_type_sniffs_json() {
        let body = br#"{"CallSid":"c2"}"#;
        let data = parse_callback_body(None, body).unwrap();
        assert_eq!(data.get("CallSid").unwrap(), "c2");
    }

    #[test]
    fn empty_bodies_are_rejected() {
        assert!(parse_callback_body(Some("application/json"), b"").is_none());
        assert!(parse_callback_body(Some("application/json"), b"{}").is_none());
        assert!(parse_callback_body(Some("application/json"), b"not json").is_none());
    }
}
