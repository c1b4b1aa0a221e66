use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::mcp::models::{
    CallToolParams, JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION,
};
use crate::mcp::state::McpState;
use crate::mcp::tools;
use crate::shared::auth::{mask_header, SessionContext, GLOBAL_SESSION_KEY};
use crate::shared::exotel::ToolError;

const SESSION_HEADER: &str = "mcp-session-id";

/// Streamable-HTTP MCP endpoint: one JSON-RPC request per POST.
pub async fn handle_rpc(
    State(state): State<McpState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Unparseable JSON-RPC request: {}", e);
            return Json(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("invalid JSON: {e}"),
            ))
            .into_response();
        }
    };

    if request.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::error(
            request.id,
            INVALID_REQUEST,
            format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
        ))
        .into_response();
    }

    // Notifications expect no response body
    if request.id.is_none() {
        debug!("Received notification '{}'", request.method);
        return StatusCode::ACCEPTED.into_response();
    }

    match request.method.as_str() {
        "initialize" => handle_initialize(&state, &headers, request.id),
        "tools/list" => Json(JsonRpcResponse::success(
            request.id,
            json!({"tools": tools::descriptors()}),
        ))
        .into_response(),
        "tools/call" => handle_tools_call(&state, &headers, request.id, request.params).await,
        "ping" => Json(JsonRpcResponse::success(request.id, json!({}))).into_response(),
        method => {
            debug!("Unknown MCP method: {}", method);
            Json(JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            ))
            .into_response()
        }
    }
}

/// Issue a fresh session id and, when the client sent credentials along,
/// bind them to it (and to the global key for transport-less callers).
fn handle_initialize(state: &McpState, headers: &HeaderMap, id: Option<Value>) -> Response {
    let session_id = Uuid::new_v4().to_string();

    if let Some(auth_header) = header_value(headers, AUTHORIZATION.as_str()) {
        info!(
            "Capturing Authorization header for MCP session {}: {}",
            session_id,
            mask_header(&auth_header)
        );
        state.exotel.sessions.record(&session_id, &auth_header);
        state.exotel.sessions.record(GLOBAL_SESSION_KEY, &auth_header);
    }

    let result = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {"tools": {}},
        "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
    });

    (
        [(SESSION_HEADER, session_id)],
        Json(JsonRpcResponse::success(id, result)),
    )
        .into_response()
}

async fn handle_tools_call(
    state: &McpState,
    headers: &HeaderMap,
    id: Option<Value>,
    params: Option<Value>,
) -> Response {
    let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
        Ok(Some(params)) => params,
        Ok(None) => {
            return Json(JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                "params are required".to_string(),
            ))
            .into_response()
        }
        Err(e) => {
            return Json(JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("invalid params: {e}"),
            ))
            .into_response()
        }
    };

    let ctx = session_context(headers);
    info!(
        "Invoking tool '{}' for session '{}'",
        params.name, ctx.session_key
    );
    let arguments = params.arguments.unwrap_or_else(|| json!({}));

    match tools::dispatch(state, &ctx, &params.name, &arguments).await {
        Ok(result) => Json(JsonRpcResponse::success(id, tool_result(result, false))).into_response(),
        Err(tools::ToolCallError::InvalidParams(message)) => {
            Json(JsonRpcResponse::error(id, INVALID_PARAMS, message)).into_response()
        }
        Err(tools::ToolCallError::Failed(err)) => {
            warn!("Tool '{}' failed: {}", params.name, err);
            let body = error_body(&err);
            Json(JsonRpcResponse::success(
                id,
                tool_result(Value::String(body), true),
            ))
            .into_response()
        }
    }
}

/// Derive the caller's session context from transport headers: the MCP
/// session id when present, a worker-derived detached key otherwise.
fn session_context(headers: &HeaderMap) -> SessionContext {
    let auth_header = header_value(headers, AUTHORIZATION.as_str());
    match header_value(headers, SESSION_HEADER) {
        Some(session_id) => SessionContext::new(session_id, auth_header),
        None => SessionContext::detached(auth_header),
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|v| !v.trim().is_empty())
}

/// Render a dispatch result as MCP tool content.
fn tool_result(value: Value, is_error: bool) -> Value {
    let text = match value {
        Value::String(s) => s,
        other => other.to_string(),
    };
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error,
    })
}

/// Tool failures surface as a JSON object with a message field rather than
/// a protocol error, mirroring the REST surface.
fn error_body(err: &ToolError) -> String {
    json!({"message": err.to_string()}).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_wraps_text_content() {
        let result = tool_result(Value::String("{\"ok\":1}".to_string()), false);
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], "{\"ok\":1}");
        assert_eq!(result["isError"], false);
    }

    #[test]
    fn tool_result_serializes_structured_values() {
        let result = tool_result(json!({"records_found": 2}), false);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("records_found"));
    }

    #[test]
    fn session_context_prefers_transport_session_id() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, "session-9".parse().unwrap());
        headers.insert(AUTHORIZATION, "Basic tok".parse().unwrap());
        let ctx = session_context(&headers);
        assert_eq!(ctx.session_key, "session-9");
        assert_eq!(ctx.auth_header.as_deref(), Some("Basic tok"));
        assert!(!ctx.is_detached());
    }

    #[test]
    fn missing_session_header_yields_detached_context() {
        let headers = HeaderMap::new();
        let ctx = session_context(&headers);
        assert!(ctx.is_detached());
        assert!(ctx.auth_header.is_none());
    }
}
