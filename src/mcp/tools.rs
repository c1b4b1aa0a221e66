use serde_json::{json, Value};

use crate::shared::auth::SessionContext;
use crate::shared::exotel::{BulkMessage, ToolError};
use crate::mcp::state::McpState;

/// Failure modes of a tool invocation, kept apart so the transport layer
/// can answer with the right JSON-RPC shape.
#[derive(Debug)]
pub enum ToolCallError {
    /// Bad name or arguments -> JSON-RPC invalid-params error
    InvalidParams(String),
    /// The operation itself failed -> tool result with isError
    Failed(ToolError),
}

impl From<ToolError> for ToolCallError {
    fn from(err: ToolError) -> Self {
        ToolCallError::Failed(err)
    }
}

fn string_schema(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

/// Descriptors for every exposed tool, in the vendor API's camelCase
/// naming. Authentication is never a tool argument; it rides on the
/// session.
pub fn descriptors() -> Vec<Value> {
    vec![
        json!({
            "name": "sendSmsToUser",
            "description": "Send an SMS message to a single user using DLT-compliant parameters. Requires phone number, DLT template ID, DLT entity ID, and message content. Authentication is handled automatically from the session.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "toNumber": string_schema("Recipient phone number"),
                    "message": string_schema("Message content"),
                    "dltTemplateId": string_schema("DLT template ID"),
                    "dltEntityId": string_schema("DLT entity ID"),
                },
                "required": ["toNumber", "message", "dltTemplateId", "dltEntityId"],
            }
        }),
        json!({
            "name": "sendVoiceCallToUser",
            "description": "Initiates a voice call to the specified user number using a fixed source number. Requires phone number. Authentication is handled automatically from the session.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "toNumber": string_schema("Phone number to call"),
                },
                "required": ["toNumber"],
            }
        }),
        json!({
            "name": "outgoingCallToConnectNumber",
            "description": "Initiates an outgoing voice call from a specified number to a target number. Requires from number and to number. Authentication is handled automatically from the session.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "fromNumber": string_schema("Originating phone number"),
                    "toNumber": string_schema("Target phone number"),
                },
                "required": ["fromNumber", "toNumber"],
            }
        }),
        json!({
            "name": "sendMessageToBulkNumbers",
            "description": "Send same SMS to multiple phone numbers at once. Requires phone numbers list and message. Authentication is handled automatically from the session.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "toNumbers": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Recipient phone numbers",
                    },
                    "message": string_schema("Message content"),
                },
                "required": ["toNumbers", "message"],
            }
        }),
        json!({
            "name": "sendDynamicBulkSms",
            "description": "Send dynamic SMS to multiple numbers in one request. Each message can have different content. Requires list of messages with Body and To fields. Authentication is handled automatically from the session.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "messages": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "Body": {"type": "string"},
                                "To": {"type": "string"},
                            },
                            "required": ["Body", "To"],
                        },
                        "description": "Messages to send",
                    },
                },
                "required": ["messages"],
            }
        }),
        json!({
            "name": "connectNumberToCallFlow",
            "description": "Initiate a voice call to connect a number to a predefined call flow using the provided app ID. Requires app ID and from number. Authentication is handled automatically from the session.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "appId": string_schema("Call flow app ID"),
                    "fromNumber": string_schema("Number to connect to the flow"),
                },
                "required": ["appId", "fromNumber"],
            }
        }),
        json!({
            "name": "getSmsCallbacks",
            "description": "Fetch all SMS callback with status records from the database for the given user and phone number. Searches in to_number field with user_id security. Requires phone number. Authentication is handled automatically from the session.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "phoneNumber": string_schema("Phone number to search for"),
                },
                "required": ["phoneNumber"],
            }
        }),
        json!({
            "name": "getVoiceCallCallbacks",
            "description": "Fetch all voice call callback with status records from the database for the given phone number. Searches in BOTH to_number OR from_number with user_id security. Requires phone number. Authentication is handled automatically from the session.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "phoneNumber": string_schema("Phone number to search for"),
                },
                "required": ["phoneNumber"],
            }
        }),
        json!({
            "name": "getBulkCallDetails",
            "description": "Fetch bulk voice call details based on passed from number. Requires from number. Authentication is handled automatically from the session.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "fromNumber": string_schema("Originating phone number"),
                },
                "required": ["fromNumber"],
            }
        }),
        json!({
            "name": "getNumberMetadata",
            "description": "Retrieve metadata details for a given phone number with caching for better performance. Requires phone number. Authentication is handled automatically from the session.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "number": string_schema("Phone number to look up"),
                },
                "required": ["number"],
            }
        }),
    ]
}

fn required_str(args: &Value, key: &str) -> Result<String, ToolCallError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolCallError::InvalidParams(format!("'{key}' is required")))
}

fn required_str_array(args: &Value, key: &str) -> Result<Vec<String>, ToolCallError> {
    let items = args
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ToolCallError::InvalidParams(format!("'{key}' must be an array")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ToolCallError::InvalidParams(format!("'{key}' entries must be strings")))
        })
        .collect()
}

/// Dispatch one `tools/call` invocation by name.
pub async fn dispatch(
    state: &McpState,
    ctx: &SessionContext,
    name: &str,
    arguments: &Value,
) -> Result<Value, ToolCallError> {
    let exotel = &state.exotel;
    match name {
        "sendSmsToUser" => {
            let response = exotel
                .send_sms(
                    ctx,
                    &required_str(arguments, "toNumber")?,
                    &required_str(arguments, "message")?,
                    &required_str(arguments, "dltTemplateId")?,
                    &required_str(arguments, "dltEntityId")?,
                )
                .await?;
            Ok(Value::String(response))
        }
        "sendVoiceCallToUser" => {
            let response = exotel
                .send_voice_call(ctx, &required_str(arguments, "toNumber")?)
                .await?;
            Ok(Value::String(response))
        }
        "outgoingCallToConnectNumber" => {
            let response = exotel
                .connect_call(
                    ctx,
                    &required_str(arguments, "fromNumber")?,
                    &required_str(arguments, "toNumber")?,
                )
                .await?;
            Ok(Value::String(response))
        }
        "sendMessageToBulkNumbers" => {
            let response = exotel
                .send_bulk_sms(
                    ctx,
                    &required_str_array(arguments, "toNumbers")?,
                    &required_str(arguments, "message")?,
                )
                .await?;
            Ok(Value::String(response))
        }
        "sendDynamicBulkSms" => {
            let raw = arguments
                .get("messages")
                .cloned()
                .ok_or_else(|| ToolCallError::InvalidParams("'messages' is required".to_string()))?;
            let messages: Vec<BulkMessage> = serde_json::from_value(raw).map_err(|e| {
                ToolCallError::InvalidParams(format!("'messages' entries are invalid: {e}"))
            })?;
            let response = exotel.send_dynamic_bulk_sms(ctx, &messages).await?;
            Ok(Value::String(response))
        }
        "connectNumberToCallFlow" => {
            let response = exotel
                .connect_call_flow(
                    ctx,
                    &required_str(arguments, "appId")?,
                    &required_str(arguments, "fromNumber")?,
                )
                .await?;
            Ok(Value::String(response))
        }
        "getSmsCallbacks" => Ok(exotel
            .sms_callbacks(ctx, &required_str(arguments, "phoneNumber")?)
            .await?),
        "getVoiceCallCallbacks" => Ok(exotel
            .voice_callbacks(ctx, &required_str(arguments, "phoneNumber")?)
            .await?),
        "getBulkCallDetails" => {
            let response = exotel
                .bulk_call_details(ctx, &required_str(arguments, "fromNumber")?)
                .await?;
            Ok(Value::String(response))
        }
        "getNumberMetadata" => {
            let response = exotel
                .number_metadata(ctx, &required_str(arguments, "number")?)
                .await?;
            Ok(Value::String(response))
        }
        other => Err(ToolCallError::InvalidParams(format!(
            "Unknown tool: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_lists_every_gateway_tool() {
        let tools = descriptors();
        let names: Vec<&str> = tools
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "sendSmsToUser",
                "sendVoiceCallToUser",
                "outgoingCallToConnectNumber",
                "sendMessageToBulkNumbers",
                "sendDynamicBulkSms",
                "connectNumberToCallFlow",
                "getSmsCallbacks",
                "getVoiceCallCallbacks",
                "getBulkCallDetails",
                "getNumberMetadata",
            ]
        );
    }

    #[test]
    fn every_descriptor_has_an_object_schema() {
        for tool in descriptors() {
            assert_eq!(tool["inputSchema"]["type"], "object", "{}", tool["name"]);
            assert!(tool["description"].as_str().unwrap().len() > 10);
            assert!(tool["inputSchema"]["required"].is_array());
        }
    }

    #[test]
    fn required_str_rejects_missing_and_non_string_values() {
        let args = json!({"toNumber": "09876543210", "count": 3});
        assert_eq!(required_str(&args, "toNumber").unwrap(), "09876543210");
        assert!(required_str(&args, "message").is_err());
        assert!(required_str(&args, "count").is_err());
    }

    #[test]
    fn required_str_array_needs_string_entries() {
        let args = json!({"toNumbers": ["1", "2"], "bad": ["1", 2]});
        assert_eq!(
            required_str_array(&args, "toNumbers").unwrap(),
            vec!["1".to_string(), "2".to_string()]
        );
        assert!(required_str_array(&args, "bad").is_err());
        assert!(required_str_array(&args, "missing").is_err());
    }
}
